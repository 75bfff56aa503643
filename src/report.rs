use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::domain::{Mirror, Repository, RunAccession};
use crate::stats::{AggregateStats, round2};
use crate::trials::{TrialSeries, TrialSummary};

pub const SCHEMA_VERSION: &str = "1.2";
pub const PROTOCOL: &str = "http";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

/// Result record submitted to the benchmarking API (schema v1.2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub schema_version: String,
    pub timestamp: String,
    pub end_timestamp: String,
    pub site: String,
    pub protocol: String,
    pub repository: Repository,
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_speed_mbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage_mb: Option<f64>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_speed_mbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_route_hops: Option<u32>,
    pub tool_version: String,
    pub notes: String,
    pub repeats: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror: Option<Mirror>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<TrialSummary>,
}

impl BenchmarkReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub site: &'a str,
    pub repository: Repository,
    pub accession: &'a RunAccession,
    pub tool_version: &'a str,
    pub mirror: Option<Mirror>,
    pub url: Option<&'a str>,
    /// Used as the start timestamp when no trial completed.
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Builds the report from the baseline, the last completed trial and the
/// aggregate. A failed trial marks the whole report failed; whatever was
/// measured before it is kept.
pub fn assemble(
    context: &ReportContext<'_>,
    baseline: &Baseline,
    series: &TrialSeries,
    notes: &[String],
) -> BenchmarkReport {
    let last = series.last();
    let status = if series.succeeded() {
        RunStatus::Success
    } else {
        RunStatus::Failure
    };

    let mut all_notes = notes.to_vec();
    all_notes.extend(baseline.notes.iter().cloned());
    if let Some(failure) = &series.failure {
        all_notes.push(format!(
            "trial {}/{} failed: {}",
            failure.trial, series.requested, failure.error
        ));
    }

    let resources = last
        .and_then(|trial| trial.resources)
        .or_else(|| series.failure.as_ref().and_then(|failure| failure.resources));
    let timestamp = series
        .completed
        .first()
        .map(|trial| trial.metrics.start_time)
        .unwrap_or(context.started_at);
    let end_timestamp = match (&series.failure, last) {
        (None, Some(trial)) => trial.metrics.end_time,
        _ => context.finished_at,
    };

    BenchmarkReport {
        schema_version: SCHEMA_VERSION.to_string(),
        timestamp: iso8601(timestamp),
        end_timestamp: iso8601(end_timestamp),
        site: context.site.to_lowercase(),
        protocol: PROTOCOL.to_string(),
        repository: context.repository,
        dataset_id: context.accession.as_str().to_string(),
        duration_sec: last.map(|trial| round2(trial.metrics.duration_sec)),
        file_size_bytes: last.map(|trial| trial.metrics.bytes_transferred),
        average_speed_mbps: last.map(|trial| round2(trial.metrics.speed_mbps)),
        cpu_usage_percent: resources.map(|sample| round2(sample.cpu_percent)),
        memory_usage_mb: resources.map(|sample| round2(sample.memory_mb)),
        status,
        checksum_md5: last.map(|trial| trial.metrics.md5.clone()),
        checksum_sha256: last.map(|trial| trial.metrics.sha256.clone()),
        write_speed_mbps: baseline.metrics.write_speed_mbps.map(round2),
        network_latency_ms: baseline.metrics.network_latency_ms.map(round2),
        network_route_hops: baseline.metrics.network_route_hops,
        tool_version: context.tool_version.to_string(),
        notes: all_notes.join("; "),
        repeats: series.requested,
        mirror: context.mirror,
        url: context.url.map(str::to_string),
        aggregate: series.summary().map(|summary| TrialSummary {
            trials: summary.trials,
            speed_mbps: AggregateStats::rounded(summary.speed_mbps),
            duration_sec: AggregateStats::rounded(summary.duration_sec),
        }),
    }
}

pub fn iso8601(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
