pub mod error;
pub mod escape;
pub mod types;

pub use error::{Result, SparqlError};
pub use escape::{escape_datetime, escape_string, escape_uri};
pub use types::{Binding, RdfTerm, SparqlResults};

use std::time::Duration;

/// Header understood by mu-authorization to bypass access rules.
const SUDO_HEADER: &str = "mu-auth-sudo";

const RESULTS_JSON: &str = "application/sparql-results+json";

pub struct SparqlClient {
    client: reqwest::Client,
    endpoint: String,
    sudo: bool,
}

impl SparqlClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            sudo: false,
        })
    }

    /// Send every request with the sudo header so graph access rules are skipped.
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Run a SELECT query and decode the JSON result set.
    pub async fn query(&self, query: &str) -> Result<SparqlResults> {
        tracing::debug!(endpoint = %self.endpoint, len = query.len(), "SPARQL query");

        let mut req = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, RESULTS_JSON)
            .form(&[("query", query)]);
        if self.sudo {
            req = req.header(SUDO_HEADER, "true");
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SparqlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Run an UPDATE request. The response body is ignored.
    pub async fn update(&self, update: &str) -> Result<()> {
        tracing::debug!(endpoint = %self.endpoint, len = update.len(), "SPARQL update");

        let mut req = self
            .client
            .post(&self.endpoint)
            .form(&[("update", update)]);
        if self.sudo {
            req = req.header(SUDO_HEADER, "true");
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SparqlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
