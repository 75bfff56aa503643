use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::BenchError;
use crate::report::BenchmarkReport;

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

pub trait ReportSubmitter {
    fn submit(&self, report: &BenchmarkReport) -> Result<u16, BenchError>;
}

/// POSTs the report as JSON, with a bearer token when one is configured.
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: &str, token: Option<&str>) -> Result<Self, BenchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("insdc-bench/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BenchError::Http(err.to_string()))?,
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| BenchError::Http(err.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|err| BenchError::Http(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl ReportSubmitter for HttpSubmitter {
    fn submit(&self, report: &BenchmarkReport) -> Result<u16, BenchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .map_err(|err| BenchError::Http(err.to_string()))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "submission rejected".to_string());
            return Err(BenchError::SubmissionStatus { status, message });
        }
        Ok(status)
    }
}
