use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checksum::compute_checksums;
use crate::download;
use crate::error::BenchError;
use crate::sampler::{ResourceProvider, ResourceSample, ResourceSampler};
use crate::stats::AggregateStats;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialMetrics {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub bytes_transferred: u64,
    pub duration_sec: f64,
    pub speed_mbps: f64,
    pub md5: String,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct TrialRecord {
    pub metrics: TrialMetrics,
    pub resources: Option<ResourceSample>,
}

#[derive(Debug)]
pub struct TrialFailure {
    /// 1-based trial number.
    pub trial: usize,
    pub error: BenchError,
    pub resources: Option<ResourceSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub speed_mbps: AggregateStats,
    pub duration_sec: AggregateStats,
}

#[derive(Debug)]
pub struct TrialSeries {
    pub requested: usize,
    pub completed: Vec<TrialRecord>,
    pub failure: Option<TrialFailure>,
}

impl TrialSeries {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.completed.len() == self.requested
    }

    /// The representative trial is always the last completed one.
    pub fn last(&self) -> Option<&TrialRecord> {
        self.completed.last()
    }

    /// Only for multi-trial runs where every trial completed.
    pub fn summary(&self) -> Option<TrialSummary> {
        if self.requested <= 1 || !self.succeeded() {
            return None;
        }
        let speeds: Vec<f64> = self.completed.iter().map(|t| t.metrics.speed_mbps).collect();
        let durations: Vec<f64> = self.completed.iter().map(|t| t.metrics.duration_sec).collect();
        Some(TrialSummary {
            trials: self.completed.len(),
            speed_mbps: AggregateStats::from_values(&speeds)?,
            duration_sec: AggregateStats::from_values(&durations)?,
        })
    }
}

/// Runs `repeats` trials one after another, stopping at the first failure.
pub fn run_trials<F>(repeats: usize, mut run_one: F) -> TrialSeries
where
    F: FnMut(usize) -> Result<TrialRecord, TrialFailure>,
{
    let mut series = TrialSeries {
        requested: repeats,
        completed: Vec::with_capacity(repeats),
        failure: None,
    };
    for trial in 1..=repeats {
        tracing::info!(trial, repeats, "starting trial");
        match run_one(trial) {
            Ok(record) => {
                tracing::info!(
                    trial,
                    bytes = record.metrics.bytes_transferred,
                    speed_mbps = record.metrics.speed_mbps,
                    "trial complete"
                );
                series.completed.push(record);
            }
            Err(failure) => {
                tracing::error!(trial, error = %failure.error, "trial failed");
                series.failure = Some(failure);
                break;
            }
        }
    }
    series
}

#[derive(Debug, Clone)]
pub struct TrialPlan<'a> {
    pub url: &'a str,
    pub destination: &'a Path,
    pub timeout: Duration,
    pub sample_interval: Duration,
    pub cleanup: bool,
}

/// One download with concurrent resource sampling, followed by checksums.
pub fn run_trial<T, P>(
    transport: &T,
    resources: &P,
    plan: &TrialPlan<'_>,
    trial: usize,
) -> Result<TrialRecord, TrialFailure>
where
    T: Transport + ?Sized,
    P: ResourceProvider + ?Sized,
{
    let sampler = ResourceSampler::start(resources.open(), plan.sample_interval);
    let transfer = download::execute(transport, plan.url, plan.destination, plan.timeout);
    let sample = sampler.stop();

    let fail = |error: BenchError| {
        if plan.cleanup {
            discard(plan.destination);
        }
        TrialFailure {
            trial,
            error,
            resources: sample,
        }
    };
    let transfer = transfer.map_err(fail)?;
    let checksums = compute_checksums(&transfer.path).map_err(fail)?;

    if plan.cleanup {
        discard(&transfer.path);
    }

    Ok(TrialRecord {
        metrics: TrialMetrics {
            start_time: transfer.started_at,
            end_time: transfer.finished_at,
            bytes_transferred: transfer.bytes,
            duration_sec: transfer.duration_sec,
            speed_mbps: transfer.speed_mbps,
            md5: checksums.md5,
            sha256: checksums.sha256,
        },
        resources: sample,
    })
}

/// Removes a downloaded or partially downloaded artifact.
fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "cleanup failed"),
    }
}
