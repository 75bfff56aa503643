use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::baseline::{self, BaselineOptions};
use crate::candidates::build_candidates;
use crate::config::Config;
use crate::domain::{CandidateUrl, MirrorPreference, Repository, RunAccession, SraMode};
use crate::error::BenchError;
use crate::probe::probe_candidates;
use crate::report::{self, BenchmarkReport, ReportContext};
use crate::sampler::ResourceProvider;
use crate::select::{self, ExplainTable, Selection, SelectionPolicy};
use crate::transport::Transport;
use crate::trials::{self, TrialPlan};

/// Timeout for each of the ping and traceroute baselines.
pub const BASELINE_TOOL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct BenchRequest {
    pub accession: RunAccession,
    pub repository: Repository,
    pub sra_mode: SraMode,
    /// Already merged with the environment override.
    pub preference: MirrorPreference,
    pub require_mirror: bool,
    pub explain: bool,
    pub repeats: usize,
    pub resolver_timeout: Duration,
    pub site: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);

    /// Receives the candidate table when explain is requested. Called before
    /// selection, so it is delivered even when selection fails.
    fn explain(&self, _table: &ExplainTable) {}
}

/// Sink that drops every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub candidates: Vec<CandidateUrl>,
    pub selection: Selection,
    pub explain: Option<ExplainTable>,
    pub notes: Vec<String>,
}

pub struct Benchmark<T: Transport, P: ResourceProvider> {
    transport: T,
    resources: P,
    config: Config,
}

impl<T: Transport, P: ResourceProvider> Benchmark<T, P> {
    pub fn new(transport: T, resources: P, config: Config) -> Self {
        Self {
            transport,
            resources,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds, probes and selects. Errors here mean no trial may run.
    pub fn resolve(
        &self,
        request: &BenchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Resolution, BenchError> {
        let mut candidates = build_candidates(
            &request.accession,
            request.repository,
            request.sra_mode,
            &self.config.sra_template,
        );
        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} candidates for {} ({}, {})",
                candidates.len(),
                request.accession,
                request.repository,
                request.sra_mode
            ),
            elapsed: None,
        });

        let started = Instant::now();
        probe_candidates(&self.transport, &mut candidates, request.resolver_timeout);
        let live = candidates.iter().filter(|c| c.is_live()).count();
        sink.event(ProgressEvent {
            message: format!("phase=Probe; {live}/{} candidates live", candidates.len()),
            elapsed: Some(started.elapsed()),
        });

        let mut notes = Vec::new();
        let explain = request.explain.then(|| ExplainTable::new(&candidates));
        if let Some(table) = &explain {
            sink.explain(table);
            for line in table.lines() {
                sink.event(ProgressEvent {
                    message: format!("phase=Explain; {line}"),
                    elapsed: None,
                });
                notes.push(format!("explain: {line}"));
            }
        }

        let policy = SelectionPolicy {
            preference: request.preference,
            require_mirror: request.require_mirror,
        };
        let selection = select::select(&candidates, policy)?;
        notes.extend(selection.notes.iter().cloned());
        sink.event(ProgressEvent {
            message: format!(
                "phase=Select; {} via {}",
                selection.candidate.url(),
                selection.candidate.mirror()
            ),
            elapsed: None,
        });

        Ok(Resolution {
            candidates,
            selection,
            explain,
            notes,
        })
    }

    /// Full run. Resolution failures are returned as errors; trial failures
    /// produce a report with `status = failure`.
    pub fn run(
        &self,
        request: &BenchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BenchmarkReport, BenchError> {
        let started_at = Utc::now();
        let resolution = self.resolve(request, sink)?;
        let chosen = &resolution.selection.candidate;

        let download_dir = PathBuf::from(self.config.download_dir.as_std_path());
        let host = chosen.host();
        let started = Instant::now();
        let baseline = baseline::measure(
            &self.transport,
            &BaselineOptions {
                scratch_dir: &download_dir,
                write_test_mb: self.config.write_test_mb,
                host: host.as_deref(),
                tool_timeout: BASELINE_TOOL_TIMEOUT,
            },
        );
        sink.event(ProgressEvent {
            message: format!(
                "phase=Baseline; write={:?} Mbps latency={:?} ms",
                baseline.metrics.write_speed_mbps, baseline.metrics.network_latency_ms
            ),
            elapsed: Some(started.elapsed()),
        });

        let file_name = chosen
            .file_name()
            .unwrap_or_else(|| format!("{}.download", request.accession));
        let destination = download_dir.join(file_name);
        let plan = TrialPlan {
            url: chosen.url(),
            destination: &destination,
            timeout: self.config.download_timeout(),
            sample_interval: self.config.sample_interval(),
            cleanup: self.config.cleanup,
        };

        let repeats = request.repeats.max(1);
        let series = trials::run_trials(repeats, |trial| {
            let started = Instant::now();
            let result = trials::run_trial(&self.transport, &self.resources, &plan, trial);
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Trial; {trial}/{repeats} {}",
                    if result.is_ok() { "complete" } else { "failed" }
                ),
                elapsed: Some(started.elapsed()),
            });
            result
        });

        let tool_version = self.transport.tool_version();
        let context = ReportContext {
            site: &request.site,
            repository: request.repository,
            accession: &request.accession,
            tool_version: &tool_version,
            mirror: Some(chosen.mirror()),
            url: Some(chosen.url()),
            started_at,
            finished_at: Utc::now(),
        };
        let report = report::assemble(&context, &baseline, &series, &resolution.notes);
        sink.event(ProgressEvent {
            message: format!("phase=Report; status={:?}", report.status),
            elapsed: None,
        });
        Ok(report)
    }
}
