#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;

use insdc_bench::error::BenchError;
use insdc_bench::sampler::{ResourceProvider, ResourceSample, ResourceSource};
use insdc_bench::transport::{FetchOutcome, Transport};

pub enum FakeFetch {
    Ok { bytes: u64, elapsed: Duration },
    Fail(String),
    /// The transfer hits its deadline.
    Timeout,
    /// Writes `bytes` to the destination, then fails.
    Partial { bytes: u64, message: String },
}

/// Serves a fixed set of live URLs and a scripted sequence of transfers.
#[derive(Default)]
pub struct FakeTransport {
    live: HashSet<String>,
    fetches: Mutex<VecDeque<FakeFetch>>,
    pub probe_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub latency_ms: Option<f64>,
    pub hops: Option<u32>,
}

impl FakeTransport {
    pub fn with_live<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            live: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn script(self, fetches: Vec<FakeFetch>) -> Self {
        *self.fetches.lock().unwrap() = fetches.into();
        self
    }

    /// One transfer per speed, each taking exactly one second.
    pub fn speeds_mbps(self, speeds: &[u64]) -> Self {
        let fetches = speeds
            .iter()
            .map(|mbps| FakeFetch::Ok {
                bytes: mbps * 125_000,
                elapsed: Duration::from_secs(1),
            })
            .collect();
        self.script(fetches)
    }
}

impl Transport for FakeTransport {
    fn probe(&self, url: &str, _timeout: Duration) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.live.contains(url)
    }

    fn fetch(
        &self,
        url: &str,
        destination: &Path,
        timeout: Duration,
    ) -> Result<FetchOutcome, BenchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.fetches.lock().unwrap().pop_front();
        match next {
            Some(FakeFetch::Ok { bytes, elapsed }) => {
                let data = vec![b'A'; usize::try_from(bytes).unwrap()];
                fs::write(destination, data).map_err(|err| BenchError::Filesystem(err.to_string()))?;
                let started_at = Utc::now();
                Ok(FetchOutcome {
                    bytes,
                    elapsed,
                    started_at,
                    finished_at: started_at + chrono::Duration::from_std(elapsed).unwrap(),
                })
            }
            Some(FakeFetch::Fail(message)) => Err(BenchError::Transfer(message)),
            Some(FakeFetch::Timeout) => Err(BenchError::TransferTimeout(timeout.as_secs())),
            Some(FakeFetch::Partial { bytes, message }) => {
                let data = vec![b'A'; usize::try_from(bytes).unwrap()];
                fs::write(destination, data).map_err(|err| BenchError::Filesystem(err.to_string()))?;
                Err(BenchError::Transfer(message))
            }
            None => Err(BenchError::Transfer(format!(
                "no scripted transfer for {url} (timeout {}s)",
                timeout.as_secs()
            ))),
        }
    }

    fn measure_latency(&self, _host: &str, _timeout: Duration) -> Option<f64> {
        self.latency_ms
    }

    fn trace_route(&self, _host: &str, _timeout: Duration) -> Option<u32> {
        self.hops
    }

    fn tool_version(&self) -> String {
        "fake-fetch 1.0".to_string()
    }
}

/// Source returning a fixed reading.
pub struct FixedSource(pub ResourceSample);

impl ResourceSource for FixedSource {
    fn sample(&mut self) -> Option<ResourceSample> {
        Some(self.0)
    }
}

pub struct FixedResources(pub ResourceSample);

impl ResourceProvider for FixedResources {
    fn open(&self) -> Option<Box<dyn ResourceSource>> {
        Some(Box::new(FixedSource(self.0)))
    }
}
