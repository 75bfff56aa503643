use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::candidates::SraTemplate;
use crate::error::BenchError;

pub const CONFIG_FILE_NAME: &str = "insdc-bench.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub site: String,
    pub api_endpoint: String,
    pub api_token: String,
    pub download_dir: Utf8PathBuf,
    pub cleanup: bool,
    /// Per-trial download timeout in seconds.
    pub timeout: u64,
    pub sample_interval_ms: u64,
    pub write_test_mb: u64,
    pub sra_template: SraTemplate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: "nci".to_string(),
            api_endpoint: "https://api.example.com/submit".to_string(),
            api_token: String::new(),
            download_dir: Utf8PathBuf::from("./downloads"),
            cleanup: true,
            timeout: 300,
            sample_interval_ms: 500,
            write_test_mb: 100,
            sra_template: SraTemplate::default(),
        }
    }
}

impl Config {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn api_token(&self) -> Option<&str> {
        let token = self.api_token.trim();
        if token.is_empty() { None } else { Some(token) }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist and parse. Without one, the working
    /// directory and then the user config directory are searched; defaults
    /// apply when neither has a file.
    pub fn resolve(path: Option<&str>) -> Result<Config, BenchError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            tracing::debug!("no config file found, using defaults");
            return Ok(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BenchError::ConfigRead(config_path.clone()))?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %config_path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Config, BenchError> {
        let config: Config = serde_json::from_str(content)
            .map_err(|err| BenchError::ConfigParse(err.to_string()))?;
        config.sra_template.validate()?;
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("org", "insdc", "insdc-bench")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }
}
