use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateStats {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
}

impl AggregateStats {
    /// `None` for an empty series.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median: median(&sorted),
            p95: nearest_rank(&sorted, 95.0),
        })
    }

    pub fn rounded(self) -> Self {
        Self {
            mean: round2(self.mean),
            median: round2(self.median),
            p95: round2(self.p95),
        }
    }
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Nearest-rank percentile: the value at rank `ceil(p/100 * n)` (1-based).
/// `sorted` must be non-empty and ascending.
pub fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let n = sorted.len();
    let rank = ((percentile / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
