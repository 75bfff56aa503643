use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use sysinfo::System;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Mean CPU and memory over one trial's download window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// One reading source, owned by the sampling thread for a single trial.
pub trait ResourceSource: Send {
    fn sample(&mut self) -> Option<ResourceSample>;
}

/// Opens a fresh source per trial. `None` means sampling is unavailable in
/// this environment.
pub trait ResourceProvider: Send + Sync {
    fn open(&self) -> Option<Box<dyn ResourceSource>>;
}

/// System-wide CPU and used memory through sysinfo.
pub struct SystemResources;

impl ResourceProvider for SystemResources {
    fn open(&self) -> Option<Box<dyn ResourceSource>> {
        SysinfoSource::new().map(|source| Box::new(source) as Box<dyn ResourceSource>)
    }
}

/// Provider for environments without a sampling facility.
pub struct NoResources;

impl ResourceProvider for NoResources {
    fn open(&self) -> Option<Box<dyn ResourceSource>> {
        None
    }
}

pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Option<Self> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return None;
        }
        let mut system = System::new();
        // CPU usage is a delta; prime it so the first sample is meaningful.
        system.refresh_cpu_usage();
        system.refresh_memory();
        Some(Self { system })
    }
}

impl ResourceSource for SysinfoSource {
    fn sample(&mut self) -> Option<ResourceSample> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        Some(ResourceSample {
            cpu_percent: f64::from(self.system.global_cpu_usage()),
            memory_mb: self.system.used_memory() as f64 / BYTES_PER_MIB,
        })
    }
}

/// Background sampler for one in-flight download.
pub struct ResourceSampler;

impl ResourceSampler {
    pub fn start(source: Option<Box<dyn ResourceSource>>, interval: Duration) -> SamplerHandle {
        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let Some(mut source) = source else {
            let _ = result_tx.send(None);
            return SamplerHandle {
                stop_tx: None,
                result_rx,
                worker: None,
            };
        };

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker = thread::spawn(move || {
            let samples = collect_until_stopped(source.as_mut(), &stop_rx, interval);
            let _ = result_tx.send(mean(&samples));
        });

        SamplerHandle {
            stop_tx: Some(stop_tx),
            result_rx,
            worker: Some(worker),
        }
    }
}

fn collect_until_stopped(
    source: &mut dyn ResourceSource,
    stop_rx: &Receiver<()>,
    interval: Duration,
) -> Vec<ResourceSample> {
    let mut samples = Vec::new();
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => samples.extend(source.sample()),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    // Downloads shorter than one interval still get a reading.
    if samples.is_empty() {
        samples.extend(source.sample());
    }
    samples
}

pub fn mean(samples: &[ResourceSample]) -> Option<ResourceSample> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    Some(ResourceSample {
        cpu_percent: samples.iter().map(|s| s.cpu_percent).sum::<f64>() / n,
        memory_mb: samples.iter().map(|s| s.memory_mb).sum::<f64>() / n,
    })
}

/// Stopping is synchronous: `stop` returns only after the sampling thread
/// has exited and reported its reduction.
pub struct SamplerHandle {
    stop_tx: Option<Sender<()>>,
    result_rx: Receiver<Option<ResourceSample>>,
    worker: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn stop(mut self) -> Option<ResourceSample> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<ResourceSample> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        let result = self.result_rx.recv().ok().flatten();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        result
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.shutdown();
        }
    }
}
