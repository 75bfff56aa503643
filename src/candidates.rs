use serde::{Deserialize, Serialize};

use crate::domain::{CandidateUrl, Mirror, Repository, RunAccession, SraMode, SuffixVariant};
use crate::error::BenchError;

pub const ENA_FASTQ_ROOT: &str = "https://ftp.sra.ebi.ac.uk/vol1/fastq";
pub const DDBJ_FASTQ_ROOT: &str = "https://ddbj.nig.ac.jp/public/ddbj_database/dra/fastq";

/// Object layout of the SRA Open Data buckets. `{acc}` in `key` is replaced
/// by the run accession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SraTemplate {
    pub aws_base: String,
    pub gcs_base: String,
    pub key: String,
    pub suffix: String,
}

impl Default for SraTemplate {
    fn default() -> Self {
        Self {
            aws_base: "https://sra-pub-run-odp.s3.amazonaws.com".to_string(),
            gcs_base: "https://storage.googleapis.com/sra-pub-run-odp".to_string(),
            key: "sra/{acc}/{acc}".to_string(),
            suffix: ".sra".to_string(),
        }
    }
}

impl SraTemplate {
    pub fn validate(&self) -> Result<(), BenchError> {
        for base in [&self.aws_base, &self.gcs_base] {
            if !(base.starts_with("https://") || base.starts_with("http://")) {
                return Err(BenchError::InvalidTemplate(format!(
                    "base URL must be http(s): {base}"
                )));
            }
        }
        if !self.key.contains("{acc}") {
            return Err(BenchError::InvalidTemplate(format!(
                "key must contain {{acc}}: {}",
                self.key
            )));
        }
        Ok(())
    }

    fn object_url(&self, mirror: Mirror, accession: &RunAccession, suffix: SuffixVariant) -> String {
        let base = match mirror {
            Mirror::Gcs => &self.gcs_base,
            _ => &self.aws_base,
        };
        let key = self.key.replace("{acc}", accession.as_str());
        let tail = match suffix {
            SuffixVariant::WithSuffix => self.suffix.as_str(),
            SuffixVariant::WithoutSuffix => "",
        };
        format!("{}/{}{}", base.trim_end_matches('/'), key.trim_start_matches('/'), tail)
    }
}

/// Builds the ordered candidate list. Pure: no I/O, same output for the same
/// inputs.
pub fn build_candidates(
    accession: &RunAccession,
    repository: Repository,
    mode: SraMode,
    template: &SraTemplate,
) -> Vec<CandidateUrl> {
    match (repository, mode) {
        (Repository::Sra, SraMode::SraCloud) => sra_cloud_candidates(accession, template),
        (Repository::Sra, SraMode::FastqViaEna) | (Repository::Ena, _) => {
            fastq_candidates(Mirror::Ena, &ena_run_dir(accession), accession)
        }
        (Repository::Ddbj, _) => fastq_candidates(Mirror::Ddbj, &ddbj_run_dir(accession), accession),
    }
}

fn sra_cloud_candidates(accession: &RunAccession, template: &SraTemplate) -> Vec<CandidateUrl> {
    let mut out = Vec::with_capacity(4);
    for mirror in [Mirror::Aws, Mirror::Gcs] {
        for suffix in [SuffixVariant::WithSuffix, SuffixVariant::WithoutSuffix] {
            out.push(CandidateUrl::new(
                template.object_url(mirror, accession, suffix),
                mirror,
                suffix,
            ));
        }
    }
    out
}

fn fastq_candidates(mirror: Mirror, run_dir: &str, accession: &RunAccession) -> Vec<CandidateUrl> {
    let acc = accession.as_str();
    vec![
        CandidateUrl::new(
            format!("{run_dir}/{acc}_1.fastq.gz"),
            mirror,
            SuffixVariant::WithSuffix,
        ),
        CandidateUrl::new(
            format!("{run_dir}/{acc}.fastq.gz"),
            mirror,
            SuffixVariant::WithoutSuffix,
        ),
    ]
}

/// ENA shards run directories by the trailing digits once the numeric part
/// is longer than six digits: 7 digits -> `00N`, 8 -> `0NN`, 9 -> `NNN`.
pub fn ena_run_dir(accession: &RunAccession) -> String {
    let acc = accession.as_str();
    let parent = &acc[..acc.len().min(6)];
    match ena_shard(accession) {
        Some(shard) => format!("{ENA_FASTQ_ROOT}/{parent}/{shard}/{acc}"),
        None => format!("{ENA_FASTQ_ROOT}/{parent}/{acc}"),
    }
}

pub fn ddbj_run_dir(accession: &RunAccession) -> String {
    let acc = accession.as_str();
    let parent = &acc[..acc.len().min(6)];
    format!("{DDBJ_FASTQ_ROOT}/{parent}/{acc}")
}

fn ena_shard(accession: &RunAccession) -> Option<String> {
    let digits = accession.digits();
    if digits.len() <= 6 {
        return None;
    }
    let extra = (digits.len() - 6).min(3);
    let tail = &digits[digits.len() - extra..];
    Some(format!("{tail:0>3}"))
}
