//! Descriptive-statistic primitives and the normal-CDF approximation
//!
//! All spreads are population-style (divide by n), matching the correlation
//! weighting in the ML module. Quantiles interpolate linearly at rank
//! p * (n - 1) on the sorted sample.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Interpolated quantile; 0 for an empty sample
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Most frequent value; ties go to the value whose winning count was reached
/// first in iteration order
pub fn mode(values: &[f64]) -> f64 {
    let mut best = values.first().copied().unwrap_or(0.0);
    let mut best_count = 0usize;
    let mut counts: Vec<(f64, usize)> = Vec::new();

    for &v in values {
        let count = match counts.iter_mut().find(|(key, _)| *key == v) {
            Some((_, c)) => {
                *c += 1;
                *c
            }
            None => {
                counts.push((v, 1));
                1
            }
        };
        if count > best_count {
            best_count = count;
            best = v;
        }
    }
    best
}

/// Ordinary least-squares fit of y against index 0..n; returns (slope, r_squared)
pub fn linear_regression(ys: &[f64]) -> (f64, f64) {
    let n = ys.len();
    if n < 2 {
        return (0.0, 0.0);
    }

    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mean_x = mean(&xs);
    let mean_y = mean(ys);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        sxy += (xs[i] - mean_x) * (ys[i] - mean_y);
        sxx += (xs[i] - mean_x) * (xs[i] - mean_x);
    }
    if sxx == 0.0 {
        return (0.0, 0.0);
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y) * (y - mean_y)).sum();
    if ss_tot == 0.0 {
        // Constant series: the fit is exact
        return (slope, 1.0);
    }
    let ss_res: f64 = ys
        .iter()
        .enumerate()
        .map(|(i, y)| {
            let fitted = intercept + slope * i as f64;
            (y - fitted) * (y - fitted)
        })
        .sum();

    (slope, 1.0 - ss_res / ss_tot)
}

/// Pearson correlation; 0 when either side has zero spread
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.is_empty() {
        return 0.0;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let std_x = std_dev(xs);
    let std_y = std_dev(ys);
    if std_x == 0.0 || std_y == 0.0 {
        return 0.0;
    }

    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| ((x - mean_x) / std_x) * ((y - mean_y) / std_y))
        .sum();
    sum / xs.len() as f64
}

/// Abramowitz-Stegun rational approximation of the standard normal CDF.
/// Accurate to ~1e-7, which is plenty for EV ranking.
pub fn normal_cdf(z: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * z.abs());
    let d = 0.3989423 * (-z * z / 2.0).exp();
    let p = d * t * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));

    if z > 0.0 {
        1.0 - p
    } else {
        p
    }
}

/// P(X <= value) for X ~ Normal(mean, std_dev). A zero-spread sample
/// degenerates to a step function at the mean.
pub fn normal_probability(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return if value < mean {
            0.0
        } else if value > mean {
            1.0
        } else {
            0.5
        };
    }
    normal_cdf((value - mean) / std_dev)
}

pub fn clamp01(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}
