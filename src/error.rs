//! Error types for the prop engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine and its collaborators
#[derive(Error, Debug)]
pub enum EngineError {
    /// Not enough qualifying games for a reliable computation
    #[error("Insufficient game data: only {found} games found, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("Player \"{0}\" not found")]
    PlayerNotFound(String),

    #[error("Team \"{0}\" not found")]
    TeamNotFound(String),

    /// Recoverable: the orchestrator falls back to statistical-only output
    #[error("Model training failed: {0}")]
    ModelTraining(String),

    #[error("Unknown stat type: {0}")]
    UnknownStatType(String),

    #[error("Stats provider error: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// True when the caller can degrade gracefully instead of failing the request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::InsufficientData { .. } | EngineError::ModelTraining(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message_includes_counts() {
        let err = EngineError::InsufficientData {
            found: 7,
            required: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("7"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(EngineError::ModelTraining("degenerate features".into()).is_recoverable());
        assert!(EngineError::InsufficientData {
            found: 0,
            required: 10
        }
        .is_recoverable());
        assert!(!EngineError::PlayerNotFound("Nobody".into()).is_recoverable());
    }
}
