use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::BenchError;
use crate::transport::Transport;

pub const BITS_PER_BYTE: f64 = 8.0;
pub const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Throughput in megabits per second; zero for a zero-length interval.
pub fn megabits_per_second(bytes: u64, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * BITS_PER_BYTE) / (seconds * BITS_PER_MEGABIT)
}

#[derive(Debug, Clone)]
pub struct Transfer {
    pub path: PathBuf,
    pub bytes: u64,
    pub duration_sec: f64,
    pub speed_mbps: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs one timed transfer of `url` into `destination`.
pub fn execute<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    destination: &Path,
    timeout: Duration,
) -> Result<Transfer, BenchError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|err| BenchError::Filesystem(err.to_string()))?;
    }
    if destination.exists() {
        fs::remove_file(destination).map_err(|err| BenchError::Filesystem(err.to_string()))?;
    }

    let outcome = transport.fetch(url, destination, timeout)?;
    if outcome.bytes == 0 {
        return Err(BenchError::EmptyTransfer(url.to_string()));
    }

    let duration_sec = outcome.elapsed.as_secs_f64();
    Ok(Transfer {
        path: destination.to_path_buf(),
        bytes: outcome.bytes,
        duration_sec,
        speed_mbps: megabits_per_second(outcome.bytes, duration_sec),
        started_at: outcome.started_at,
        finished_at: outcome.finished_at,
    })
}
