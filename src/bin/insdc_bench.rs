use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use insdc_bench::bench::{BenchRequest, Benchmark};
use insdc_bench::config::ConfigLoader;
use insdc_bench::domain::{MirrorPreference, Repository, RunAccession, SraMode};
use insdc_bench::error::BenchError;
use insdc_bench::output::{JsonOutput, LogSink};
use insdc_bench::sampler::SystemResources;
use insdc_bench::submit::{HttpSubmitter, ReportSubmitter};
use insdc_bench::transport::SystemTransport;

const MIRROR_ENV: &str = "SRA_MIRROR";
const EXIT_REPORT_FAILED: u8 = 5;

#[derive(Parser)]
#[command(name = "insdc-bench")]
#[command(about = "Benchmark HTTP/HTTPS downloads of INSDC runs across ENA, SRA and DDBJ mirrors")]
#[command(version, author)]
struct Cli {
    /// Run accession, e.g. SRR12345678
    #[arg(long)]
    dataset: String,

    #[arg(long, value_enum, default_value_t = Repository::Sra)]
    repository: Repository,

    /// Site identifier (overrides config)
    #[arg(long)]
    site: Option<String>,

    /// Per-candidate probe timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout: u64,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    repeats: u64,

    #[arg(long)]
    no_submit: bool,

    #[arg(long, value_enum, default_value_t = SraMode::SraCloud)]
    sra_mode: SraMode,

    /// Preferred mirror; the SRA_MIRROR environment variable takes precedence
    #[arg(long, value_enum, default_value_t = MirrorPreference::Auto)]
    mirror: MirrorPreference,

    /// Fail instead of falling back when the preferred mirror is unavailable
    #[arg(long, overrides_with = "no_require_mirror")]
    require_mirror: bool,

    #[arg(long, overrides_with = "require_mirror")]
    no_require_mirror: bool,

    /// Print every candidate URL with its probe result
    #[arg(long)]
    explain: bool,

    /// Config file path (JSON)
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<BenchError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &BenchError) -> u8 {
    match error {
        BenchError::InvalidAccession(_)
        | BenchError::InvalidMirror(_)
        | BenchError::InvalidTemplate(_)
        | BenchError::ConfigRead(_)
        | BenchError::ConfigParse(_) => 2,
        BenchError::Http(_) | BenchError::MissingTool(_) => 3,
        BenchError::NoLiveCandidate { .. } | BenchError::ForcedMirrorUnavailable { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    let accession: RunAccession = cli.dataset.parse()?;
    let env_mirror = std::env::var(MIRROR_ENV).ok();
    let preference = MirrorPreference::effective(cli.mirror, env_mirror.as_deref())?;
    if env_mirror.is_some() && preference != cli.mirror {
        tracing::info!(env = MIRROR_ENV, mirror = %preference, "mirror preference overridden by environment");
    }

    let request = BenchRequest {
        accession,
        repository: cli.repository,
        sra_mode: cli.sra_mode,
        preference,
        require_mirror: cli.require_mirror && !cli.no_require_mirror,
        explain: cli.explain,
        repeats: usize::try_from(cli.repeats).into_diagnostic()?,
        resolver_timeout: Duration::from_secs(cli.timeout),
        site: cli.site.clone().unwrap_or_else(|| config.site.clone()),
    };

    let transport = SystemTransport::new()?;
    let bench = Benchmark::new(transport, SystemResources, config);
    let report = bench.run(&request, &LogSink)?;

    JsonOutput::print_report(&report).into_diagnostic()?;

    if cli.no_submit {
        tracing::info!("skipping submission (--no-submit)");
    } else {
        let config = bench.config();
        let submitted = HttpSubmitter::new(&config.api_endpoint, config.api_token())
            .and_then(|submitter| submitter.submit(&report));
        match submitted {
            Ok(status) => tracing::info!(status, endpoint = %config.api_endpoint, "report submitted"),
            Err(err) => tracing::warn!(error = %err, "submission failed; report printed above"),
        }
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_REPORT_FAILED))
    }
}
