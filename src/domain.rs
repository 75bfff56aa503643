use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::BenchError;

static RUN_ACCESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]+)([0-9]+)$").expect("run accession pattern is valid")
});

/// INSDC run accession such as `SRR12345678`, `ERR000001` or `DRR000001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunAccession(String);

impl RunAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        let split = self.0.find(|ch: char| ch.is_ascii_digit()).unwrap_or(0);
        &self.0[..split]
    }

    pub fn digits(&self) -> &str {
        &self.0[self.prefix().len()..]
    }
}

impl fmt::Display for RunAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunAccession {
    type Err = BenchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !RUN_ACCESSION.is_match(&normalized) {
            return Err(BenchError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Repository {
    #[value(name = "SRA")]
    Sra,
    #[value(name = "ENA")]
    Ena,
    #[value(name = "DDBJ")]
    Ddbj,
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repository::Sra => write!(f, "SRA"),
            Repository::Ena => write!(f, "ENA"),
            Repository::Ddbj => write!(f, "DDBJ"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SraMode {
    #[default]
    #[value(name = "sra_cloud")]
    SraCloud,
    #[value(name = "fastq_via_ena")]
    FastqViaEna,
}

impl fmt::Display for SraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SraMode::SraCloud => write!(f, "sra_cloud"),
            SraMode::FastqViaEna => write!(f, "fastq_via_ena"),
        }
    }
}

/// Host that serves a candidate object.
///
/// The declaration order is the auto-selection priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    Aws,
    Gcs,
    Ena,
    Ddbj,
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mirror::Aws => write!(f, "aws"),
            Mirror::Gcs => write!(f, "gcs"),
            Mirror::Ena => write!(f, "ena"),
            Mirror::Ddbj => write!(f, "ddbj"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MirrorPreference {
    #[default]
    Auto,
    Aws,
    Gcs,
}

impl MirrorPreference {
    /// The environment value wins over the command-line value when present.
    pub fn effective(command: MirrorPreference, env: Option<&str>) -> Result<Self, BenchError> {
        match env.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.parse(),
            None => Ok(command),
        }
    }

    pub fn forced(self) -> Option<Mirror> {
        match self {
            MirrorPreference::Auto => None,
            MirrorPreference::Aws => Some(Mirror::Aws),
            MirrorPreference::Gcs => Some(Mirror::Gcs),
        }
    }
}

impl fmt::Display for MirrorPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorPreference::Auto => write!(f, "auto"),
            MirrorPreference::Aws => write!(f, "aws"),
            MirrorPreference::Gcs => write!(f, "gcs"),
        }
    }
}

impl FromStr for MirrorPreference {
    type Err = BenchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(MirrorPreference::Auto),
            "aws" => Ok(MirrorPreference::Aws),
            "gcs" => Ok(MirrorPreference::Gcs),
            _ => Err(BenchError::InvalidMirror(value.to_string())),
        }
    }
}

/// Whether the object key carries the trailing suffix (`.sra`, or the
/// `_1` read number for FASTQ layouts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixVariant {
    WithoutSuffix,
    WithSuffix,
}

impl fmt::Display for SuffixVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuffixVariant::WithSuffix => write!(f, "with_suffix"),
            SuffixVariant::WithoutSuffix => write!(f, "without_suffix"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    #[default]
    Unknown,
    Live,
    Dead,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liveness::Unknown => write!(f, "unknown"),
            Liveness::Live => write!(f, "live"),
            Liveness::Dead => write!(f, "dead"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateUrl {
    url: String,
    mirror: Mirror,
    suffix: SuffixVariant,
    liveness: Liveness,
}

impl CandidateUrl {
    pub fn new(url: impl Into<String>, mirror: Mirror, suffix: SuffixVariant) -> Self {
        Self {
            url: url.into(),
            mirror,
            suffix,
            liveness: Liveness::Unknown,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mirror(&self) -> Mirror {
        self.mirror
    }

    pub fn suffix(&self) -> SuffixVariant {
        self.suffix
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn is_live(&self) -> bool {
        self.liveness == Liveness::Live
    }

    /// Records the probe outcome. Only the first call has an effect; returns
    /// whether the state changed.
    pub fn record_liveness(&mut self, live: bool) -> bool {
        if self.liveness != Liveness::Unknown {
            return false;
        }
        self.liveness = if live { Liveness::Live } else { Liveness::Dead };
        true
    }

    /// Host part of the URL, used for latency and route baselines. IPv6
    /// addresses come back without brackets.
    pub fn host(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        match url.host()? {
            Host::Domain(domain) => Some(domain.to_string()),
            Host::Ipv4(addr) => Some(addr.to_string()),
            Host::Ipv6(addr) => Some(addr.to_string()),
        }
    }

    /// Last path segment, used to name the local artifact.
    pub fn file_name(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        url.path_segments()?
            .next_back()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}
