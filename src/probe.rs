use std::thread;
use std::time::Duration;

use crate::domain::CandidateUrl;
use crate::transport::Transport;

/// Upper bound on probes in flight at once.
pub const MAX_PARALLEL_PROBES: usize = 8;

/// Probes every candidate and records live/dead in place. Returns only after
/// every probe has finished, so no candidate is left `Unknown`. Order is
/// preserved.
pub fn probe_candidates<T: Transport + ?Sized>(
    transport: &T,
    candidates: &mut [CandidateUrl],
    timeout: Duration,
) {
    for batch in candidates.chunks_mut(MAX_PARALLEL_PROBES) {
        let outcomes: Vec<bool> = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|candidate| {
                    let url = candidate.url();
                    scope.spawn(move || transport.probe(url, timeout))
                })
                .collect();
            // A panicking probe counts as dead.
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .collect()
        });

        for (candidate, live) in batch.iter_mut().zip(outcomes) {
            candidate.record_liveness(live);
            tracing::debug!(
                url = candidate.url(),
                mirror = %candidate.mirror(),
                liveness = %candidate.liveness(),
                "probed candidate"
            );
        }
    }
}
