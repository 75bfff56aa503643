use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::Builder;

use crate::download::megabits_per_second;
use crate::error::BenchError;
use crate::transport::Transport;

const BLOCK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BaselineMetrics {
    pub write_speed_mbps: Option<f64>,
    pub network_latency_ms: Option<f64>,
    pub network_route_hops: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pub metrics: BaselineMetrics,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BaselineOptions<'a> {
    pub scratch_dir: &'a Path,
    pub write_test_mb: u64,
    pub host: Option<&'a str>,
    pub tool_timeout: Duration,
}

/// Runs once per benchmark. Nothing here is fatal: a measurement that
/// cannot be taken is left out and noted.
pub fn measure<T: Transport + ?Sized>(transport: &T, options: &BaselineOptions<'_>) -> Baseline {
    let mut baseline = Baseline::default();

    match write_speed(options.scratch_dir, options.write_test_mb) {
        Ok(speed) => baseline.metrics.write_speed_mbps = Some(speed),
        Err(err) => {
            tracing::warn!(error = %err, "write baseline unavailable");
            baseline.notes.push(format!("write baseline unavailable: {err}"));
        }
    }

    let Some(host) = options.host else {
        baseline
            .notes
            .push("network baseline skipped: selected URL has no host".to_string());
        return baseline;
    };

    baseline.metrics.network_latency_ms = transport.measure_latency(host, options.tool_timeout);
    if baseline.metrics.network_latency_ms.is_none() {
        tracing::warn!(host, "latency baseline unavailable");
        baseline
            .notes
            .push(format!("latency baseline unavailable for {host}"));
    }

    baseline.metrics.network_route_hops = transport.trace_route(host, options.tool_timeout);
    if baseline.metrics.network_route_hops.is_none() {
        tracing::warn!(host, "route baseline unavailable");
        baseline
            .notes
            .push(format!("route baseline unavailable for {host}"));
    }

    baseline
}

/// Writes `size_mb` MiB of zeros to a scratch file in `dir` and reports the
/// throughput in megabits per second.
pub fn write_speed(dir: &Path, size_mb: u64) -> Result<f64, BenchError> {
    if size_mb == 0 {
        return Err(BenchError::Filesystem("write test size is zero".to_string()));
    }
    fs::create_dir_all(dir).map_err(|err| BenchError::Filesystem(err.to_string()))?;
    let mut scratch = Builder::new()
        .prefix(".insdc-bench-write-")
        .tempfile_in(dir)
        .map_err(|err| BenchError::Filesystem(err.to_string()))?;

    let block = vec![b'0'; BLOCK_BYTES];
    let start = Instant::now();
    for _ in 0..size_mb {
        scratch
            .write_all(&block)
            .map_err(|err| BenchError::Filesystem(err.to_string()))?;
    }
    scratch
        .as_file()
        .sync_all()
        .map_err(|err| BenchError::Filesystem(err.to_string()))?;
    let elapsed = start.elapsed().as_secs_f64();

    let bytes = size_mb * BLOCK_BYTES as u64;
    if elapsed <= 0.0 {
        return Err(BenchError::Filesystem("write test finished too fast to time".to_string()));
    }
    Ok(megabits_per_second(bytes, elapsed))
}
