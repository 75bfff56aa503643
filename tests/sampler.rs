mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use insdc_bench::sampler::{
    NoResources, ResourceProvider, ResourceSample, ResourceSampler, ResourceSource,
};

use common::FixedSource;

#[test]
fn unavailable_facility_yields_nothing() {
    let handle = ResourceSampler::start(NoResources.open(), Duration::from_millis(10));
    assert!(handle.stop().is_none());
}

#[test]
fn fixed_readings_reduce_to_their_value() {
    let reading = ResourceSample {
        cpu_percent: 12.5,
        memory_mb: 2048.0,
    };
    let handle = ResourceSampler::start(
        Some(Box::new(FixedSource(reading))),
        Duration::from_millis(5),
    );
    thread::sleep(Duration::from_millis(40));
    assert_eq!(handle.stop(), Some(reading));
}

#[test]
fn immediate_stop_still_takes_one_reading() {
    let reading = ResourceSample {
        cpu_percent: 1.0,
        memory_mb: 1.0,
    };
    let handle = ResourceSampler::start(
        Some(Box::new(FixedSource(reading))),
        Duration::from_secs(60),
    );
    assert_eq!(handle.stop(), Some(reading));
}

/// Alternates between two readings and counts how often it is asked.
struct Alternating {
    calls: Arc<AtomicUsize>,
}

impl ResourceSource for Alternating {
    fn sample(&mut self) -> Option<ResourceSample> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let value = if n % 2 == 0 { 10.0 } else { 30.0 };
        Some(ResourceSample {
            cpu_percent: value,
            memory_mb: value * 10.0,
        })
    }
}

#[test]
fn sampling_stops_with_the_handle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = ResourceSampler::start(
        Some(Box::new(Alternating {
            calls: Arc::clone(&calls),
        })),
        Duration::from_millis(5),
    );
    thread::sleep(Duration::from_millis(50));
    let sample = handle.stop().unwrap();
    let after_stop = calls.load(Ordering::SeqCst);
    assert!(after_stop >= 1);
    assert!(sample.cpu_percent >= 10.0 && sample.cpu_percent <= 30.0);

    thread::sleep(Duration::from_millis(30));
    assert_eq!(calls.load(Ordering::SeqCst), after_stop);
}

#[test]
fn dropping_the_handle_joins_the_worker() {
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let _handle = ResourceSampler::start(
            Some(Box::new(Alternating {
                calls: Arc::clone(&calls),
            })),
            Duration::from_millis(5),
        );
        thread::sleep(Duration::from_millis(20));
    }
    let after_drop = calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(calls.load(Ordering::SeqCst), after_drop);
}
