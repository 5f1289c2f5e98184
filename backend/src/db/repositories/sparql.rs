//! SPARQL-over-HTTP client.
//!
//! Queries are POSTed form-encoded (`query=...`) and answered as
//! `application/sparql-results+json`.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::db::repo_config::SparqlConfig;
use crate::db::repository::{
    parse_sparql_json, ErrorContext, RepositoryError, RepositoryResult, SparqlClient, SparqlRow,
};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// [`SparqlClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSparqlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSparqlClient {
    pub fn new(config: &SparqlConfig) -> RepositoryResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(RepositoryError::configuration(
                "SPARQL endpoint must not be empty",
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            RepositoryError::configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SparqlClient for HttpSparqlClient {
    async fn select(&self, query: &str) -> RepositoryResult<Vec<SparqlRow>> {
        debug!(endpoint = %self.endpoint, "sending SPARQL query");

        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %self.endpoint, %status, "SPARQL endpoint returned an error");
            let context = ErrorContext::new("select")
                .with_entity("sparql")
                .with_details(body.chars().take(200).collect::<String>());
            let context = if status.is_server_error() {
                context.retryable()
            } else {
                context
            };
            return Err(RepositoryError::query_with_context(
                format!("HTTP {}", status),
                context,
            ));
        }

        let body = response.text().await?;
        parse_sparql_json(&body)
    }
}
