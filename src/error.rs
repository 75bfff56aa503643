use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BenchError {
    #[error("invalid run accession: {0}")]
    InvalidAccession(String),

    #[error("invalid mirror preference: {0} (expected auto, aws or gcs)")]
    InvalidMirror(String),

    #[error("invalid SRA object template: {0}")]
    InvalidTemplate(String),

    #[error("no reachable download URL among {candidates} candidates")]
    #[diagnostic(help("rerun with --explain to see every candidate and its probe result"))]
    NoLiveCandidate { candidates: usize },

    #[error("mirror {mirror} has no reachable object and --require-mirror forbids fallback")]
    #[diagnostic(help("drop --require-mirror or choose another mirror; {candidates} candidates were probed"))]
    ForcedMirrorUnavailable { mirror: String, candidates: usize },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("transfer timed out after {0} seconds")]
    TransferTimeout(u64),

    #[error("transfer produced no data: {0}")]
    EmptyTransfer(String),

    #[error("checksum failed: {0}")]
    Checksum(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("submission endpoint returned status {status}: {message}")]
    SubmissionStatus { status: u16, message: String },
}

impl BenchError {
    /// Errors that end a single trial rather than the resolution phase.
    pub fn is_trial_failure(&self) -> bool {
        matches!(
            self,
            BenchError::Transfer(_)
                | BenchError::TransferTimeout(_)
                | BenchError::EmptyTransfer(_)
                | BenchError::Checksum(_)
                | BenchError::MissingTool(_)
                | BenchError::Filesystem(_)
        )
    }

    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            BenchError::NoLiveCandidate { .. } | BenchError::ForcedMirrorUnavailable { .. }
        )
    }
}
