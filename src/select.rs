use std::fmt;

use serde::Serialize;

use crate::domain::{CandidateUrl, Mirror, MirrorPreference};
use crate::error::BenchError;

/// How the chosen URL was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRoute {
    /// Auto policy, first live candidate by mirror priority.
    Auto,
    /// The requested mirror had a live candidate.
    Forced { mirror: Mirror },
    /// The requested mirror was dead and the auto policy picked another.
    Fallback { requested: Mirror },
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub index: usize,
    pub candidate: CandidateUrl,
    pub route: SelectionRoute,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub preference: MirrorPreference,
    pub require_mirror: bool,
}

enum Decision {
    Pick(usize, SelectionRoute),
    Fail(BenchError),
}

/// Picks exactly one probed candidate, or explains which policy branch
/// failed.
pub fn select(candidates: &[CandidateUrl], policy: SelectionPolicy) -> Result<Selection, BenchError> {
    let forced = policy.preference.forced();
    let forced_pick = forced.and_then(|mirror| best_live(candidates, |c| c.mirror() == mirror));
    let auto_pick = best_live(candidates, |_| true);
    let total = candidates.len();

    let decision = match (forced, policy.require_mirror, forced_pick, auto_pick) {
        (None, _, _, Some(index)) => Decision::Pick(index, SelectionRoute::Auto),
        (None, _, _, None) => Decision::Fail(BenchError::NoLiveCandidate { candidates: total }),
        (Some(mirror), _, Some(index), _) => {
            Decision::Pick(index, SelectionRoute::Forced { mirror })
        }
        (Some(mirror), true, None, _) => Decision::Fail(BenchError::ForcedMirrorUnavailable {
            mirror: mirror.to_string(),
            candidates: total,
        }),
        (Some(mirror), false, None, Some(index)) => {
            Decision::Pick(index, SelectionRoute::Fallback { requested: mirror })
        }
        (Some(_), false, None, None) => {
            Decision::Fail(BenchError::NoLiveCandidate { candidates: total })
        }
    };

    match decision {
        Decision::Pick(index, route) => {
            let candidate = candidates[index].clone();
            let mut notes = Vec::new();
            if let SelectionRoute::Fallback { requested } = route {
                let note = format!(
                    "mirror fallback: {requested} had no live object, using {} ({})",
                    candidate.mirror(),
                    candidate.url()
                );
                tracing::warn!("{note}");
                notes.push(note);
            }
            tracing::info!(url = candidate.url(), mirror = %candidate.mirror(), "selected candidate");
            Ok(Selection {
                index,
                candidate,
                route,
                notes,
            })
        }
        Decision::Fail(err) => Err(err),
    }
}

/// Live candidate with the best (mirror priority, suffix variant) rank;
/// ties keep builder order.
fn best_live<F>(candidates: &[CandidateUrl], filter: F) -> Option<usize>
where
    F: Fn(&CandidateUrl) -> bool,
{
    candidates
        .iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.is_live() && filter(candidate))
        .min_by_key(|(index, candidate)| (candidate.mirror(), candidate.suffix(), *index))
        .map(|(index, _)| index)
}

/// Diagnostic listing of every candidate and its probe result.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainTable {
    pub rows: Vec<CandidateUrl>,
}

impl ExplainTable {
    pub fn new(candidates: &[CandidateUrl]) -> Self {
        Self {
            rows: candidates.to_vec(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                table_row(
                    &row.mirror().to_string(),
                    &row.suffix().to_string(),
                    &row.liveness().to_string(),
                    row.url(),
                )
            })
            .collect()
    }
}

/// Column widths fit the longest value of each column, header included.
fn table_row(mirror: &str, variant: &str, status: &str, url: &str) -> String {
    format!("{mirror:<6} {variant:<14} {status:<7} {url}")
}

impl fmt::Display for ExplainTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", table_row("mirror", "variant", "status", "url"))?;
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
