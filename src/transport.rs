use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, RANGE, USER_AGENT};

use crate::error::BenchError;

const PING_COUNT: u32 = 3;
const TRACEROUTE_MAX_HOPS: u32 = 5;
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Result of one completed transfer.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub bytes: u64,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything the benchmark needs from the network and external tools.
pub trait Transport: Send + Sync {
    /// Lightweight existence check. Any error or non-2xx answer is `false`.
    fn probe(&self, url: &str, timeout: Duration) -> bool;
    fn fetch(&self, url: &str, destination: &Path, timeout: Duration)
    -> Result<FetchOutcome, BenchError>;
    /// Average round-trip time in milliseconds, if it could be measured.
    fn measure_latency(&self, host: &str, timeout: Duration) -> Option<f64>;
    /// Number of hops to `host`, if it could be measured.
    fn trace_route(&self, host: &str, timeout: Duration) -> Option<u32>;
    fn tool_version(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchToolKind {
    Wget,
    Curl,
}

#[derive(Debug, Clone)]
pub struct FetchTool {
    pub kind: FetchToolKind,
    pub path: PathBuf,
}

impl FetchTool {
    fn args(&self, url: &str, destination: &Path) -> Vec<String> {
        let dest = destination.to_string_lossy().to_string();
        match self.kind {
            FetchToolKind::Wget => vec!["-q".to_string(), "-O".to_string(), dest, url.to_string()],
            FetchToolKind::Curl => vec![
                "-f".to_string(),
                "-s".to_string(),
                "-S".to_string(),
                "-L".to_string(),
                "-o".to_string(),
                dest,
                url.to_string(),
            ],
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            FetchToolKind::Wget => "wget",
            FetchToolKind::Curl => "curl",
        }
    }
}

/// Real transport: HTTP probes through reqwest, transfers and baselines
/// through tools found on `PATH`.
#[derive(Clone)]
pub struct SystemTransport {
    client: Client,
    fetcher: Option<FetchTool>,
    ping: Option<PathBuf>,
    traceroute: Option<PathBuf>,
}

impl SystemTransport {
    pub fn new() -> Result<Self, BenchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("insdc-bench/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BenchError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| BenchError::Http(err.to_string()))?;

        let fetcher = find_in_path("wget")
            .map(|path| FetchTool {
                kind: FetchToolKind::Wget,
                path,
            })
            .or_else(|| {
                find_in_path("curl").map(|path| FetchTool {
                    kind: FetchToolKind::Curl,
                    path,
                })
            });

        Ok(Self {
            client,
            fetcher,
            ping: find_in_path("ping"),
            traceroute: find_in_path("traceroute"),
        })
    }

    pub fn fetch_tool(&self) -> Option<&FetchTool> {
        self.fetcher.as_ref()
    }

    fn ranged_probe(&self, url: &str, timeout: Duration) -> bool {
        self.client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .timeout(timeout)
            .send()
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}

impl Transport for SystemTransport {
    fn probe(&self, url: &str, timeout: Duration) -> bool {
        match self.client.head(url).timeout(timeout).send() {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) if resp.status() == StatusCode::METHOD_NOT_ALLOWED => {
                self.ranged_probe(url, timeout)
            }
            Ok(resp) => {
                tracing::debug!(url, status = resp.status().as_u16(), "probe rejected");
                false
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "probe failed");
                false
            }
        }
    }

    fn fetch(
        &self,
        url: &str,
        destination: &Path,
        timeout: Duration,
    ) -> Result<FetchOutcome, BenchError> {
        let tool = self
            .fetcher
            .as_ref()
            .ok_or_else(|| BenchError::MissingTool("wget or curl".to_string()))?;
        let mut cmd = Command::new(&tool.path);
        cmd.args(tool.args(url, destination));

        let run = run_with_deadline(cmd, timeout)
            .map_err(|err| BenchError::Transfer(format!("{}: {err}", tool.name())))?;

        let status = match run.status {
            Some(status) => status,
            None => return Err(BenchError::TransferTimeout(timeout.as_secs())),
        };
        if !status.success() {
            let stderr = run.stderr.trim();
            let message = if stderr.is_empty() {
                format!("{} exited with {status}", tool.name())
            } else {
                format!("{} exited with {status}: {stderr}", tool.name())
            };
            return Err(BenchError::Transfer(message));
        }

        let bytes = fs::metadata(destination)
            .map(|meta| meta.len())
            .map_err(|err| BenchError::Filesystem(format!("{}: {err}", destination.display())))?;
        Ok(FetchOutcome {
            bytes,
            elapsed: run.elapsed,
            started_at: run.started_at,
            finished_at: run.finished_at,
        })
    }

    fn measure_latency(&self, host: &str, timeout: Duration) -> Option<f64> {
        let ping = self.ping.as_ref()?;
        let mut cmd = Command::new(ping);
        cmd.args([
            "-c".to_string(),
            PING_COUNT.to_string(),
            "-W".to_string(),
            timeout.as_secs().max(1).to_string(),
            host.to_string(),
        ]);
        let deadline = timeout * (PING_COUNT + 1);
        let run = run_with_deadline(cmd, deadline).ok()?;
        if !run.status?.success() {
            return None;
        }
        parse_ping_average(&run.stdout)
    }

    fn trace_route(&self, host: &str, timeout: Duration) -> Option<u32> {
        let traceroute = self.traceroute.as_ref()?;
        let mut cmd = Command::new(traceroute);
        cmd.args(["-m".to_string(), TRACEROUTE_MAX_HOPS.to_string(), host.to_string()]);
        let run = run_with_deadline(cmd, timeout).ok()?;
        run.status?;
        parse_traceroute_hops(&run.stdout)
    }

    fn tool_version(&self) -> String {
        let fetcher = self
            .fetcher
            .as_ref()
            .and_then(|tool| tool_version(&tool.path, &["--version"]))
            .unwrap_or_else(|| "no fetch tool".to_string());
        format!("insdc-bench {} ({fetcher})", env!("CARGO_PKG_VERSION"))
    }
}

struct DeadlineRun {
    /// `None` when the deadline expired and the child was killed.
    status: Option<ExitStatus>,
    stdout: String,
    stderr: String,
    /// Measured from the moment the child was spawned.
    elapsed: Duration,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

fn run_with_deadline(mut cmd: Command, timeout: Duration) -> std::io::Result<DeadlineRun> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    let start = Instant::now();
    let started_at = Utc::now();
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };
    let elapsed = start.elapsed();
    let finished_at = Utc::now();

    let collect = |handle: Option<thread::JoinHandle<String>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };
    Ok(DeadlineRun {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
        elapsed,
        started_at,
        finished_at,
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Parses `rtt min/avg/max/mdev = 8.8/9.1/9.5/0.2 ms` (Linux) or
/// `round-trip min/avg/max/stddev = ...` (BSD).
pub fn parse_ping_average(output: &str) -> Option<f64> {
    output
        .lines()
        .find(|line| line.contains("min/avg/max") || line.contains("round-trip"))
        .and_then(|line| line.rsplit('=').next())
        .and_then(|values| values.trim().split('/').nth(1))
        .and_then(|avg| avg.trim().parse::<f64>().ok())
}

/// Counts numbered hop lines in traceroute output.
pub fn parse_traceroute_hops(output: &str) -> Option<u32> {
    let hops = output
        .lines()
        .filter(|line| {
            line.split_whitespace()
                .next()
                .map(|token| token.chars().all(|ch| ch.is_ascii_digit()))
                .unwrap_or(false)
        })
        .count();
    if hops == 0 { None } else { u32::try_from(hops).ok() }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
