use std::io::{self, Write};

use serde::Serialize;

use crate::bench::{ProgressEvent, ProgressSink};
use crate::report::BenchmarkReport;
use crate::select::ExplainTable;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &BenchmarkReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Forwards pipeline progress to the tracing subscriber. The explain table
/// goes straight to stderr so it shows regardless of the log filter.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => tracing::info!("{}", event.message),
        }
    }

    fn explain(&self, table: &ExplainTable) {
        let mut stderr = io::stderr().lock();
        if let Err(err) = write!(stderr, "{table}") {
            tracing::warn!(%err, "could not print explain table");
        }
    }
}
