//! Flat-file player store
//!
//! One JSON blob per player (`player_{id}.json`) in a single directory.
//! Writes replace the whole file; there is no cross-file consistency to
//! maintain, so no locking either.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::Result;
use crate::types::{PlayerDataset, PlayerInfo};

#[derive(Debug, Clone)]
pub struct PlayerStore {
    dir: PathBuf,
}

impl PlayerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, player_id: u64) -> PathBuf {
        self.dir.join(format!("player_{player_id}.json"))
    }

    /// Write (or replace) the player's dataset
    pub async fn save(&self, dataset: &PlayerDataset) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(dataset)?;
        fs::write(self.path_for(dataset.player.id), json).await?;
        tracing::debug!(player_id = dataset.player.id, "dataset saved");
        Ok(())
    }

    /// Dataset by numeric id; None when the file does not exist
    pub async fn load_by_id(&self, player_id: u64) -> Result<Option<PlayerDataset>> {
        match fs::read_to_string(self.path_for(player_id)).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// First dataset whose player name contains `query`, case-insensitive.
    /// Scans the whole directory; fine at a few hundred players.
    pub async fn load_by_name(&self, query: &str) -> Result<Option<PlayerDataset>> {
        let needle = query.to_lowercase();
        for dataset in self.scan().await? {
            if dataset.player.name.to_lowercase().contains(&needle) {
                return Ok(Some(dataset));
            }
        }
        Ok(None)
    }

    /// Dataset by numeric id or name fragment
    pub async fn load(&self, name_or_id: &str) -> Result<Option<PlayerDataset>> {
        if let Ok(id) = name_or_id.parse::<u64>() {
            return self.load_by_id(id).await;
        }
        self.load_by_name(name_or_id).await
    }

    /// Identities of every cached player
    pub async fn list_players(&self) -> Result<Vec<PlayerInfo>> {
        let mut players: Vec<PlayerInfo> =
            self.scan().await?.into_iter().map(|d| d.player).collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }

    /// All parseable player files; unreadable or corrupt files are logged
    /// and skipped, never fatal
    async fn scan(&self) -> Result<Vec<PlayerDataset>> {
        let mut read_dir = match fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut datasets = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("player_") || !name.ends_with(".json") {
                continue;
            }

            match fs::read_to_string(&path).await {
                Ok(json) => match serde_json::from_str::<PlayerDataset>(&json) {
                    Ok(dataset) => datasets.push(dataset),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping corrupt player file");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable player file");
                }
            }
        }
        Ok(datasets)
    }
}
