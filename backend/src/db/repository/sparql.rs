//! SPARQL `SELECT` interface.
//!
//! Rows follow the W3C `application/sparql-results+json` shape:
//! `{ "results": { "bindings": [ { "var": { "type": "...", "value": "..." } } ] } }`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::Period;

use super::error::{ErrorContext, RepositoryError, RepositoryResult};

/// One bound value in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlTerm {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl SparqlTerm {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: Some("literal".to_string()),
            value: value.into(),
            datatype: None,
        }
    }

    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: Some("uri".to_string()),
            value: value.into(),
            datatype: None,
        }
    }
}

/// Variable name to bound term. Unbound variables are absent.
pub type SparqlRow = HashMap<String, SparqlTerm>;

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<SparqlRow>,
}

/// Decode a `sparql-results+json` document into rows.
pub fn parse_sparql_json(body: &str) -> RepositoryResult<Vec<SparqlRow>> {
    let parsed: SparqlResults = serde_json::from_str(body).map_err(|e| {
        RepositoryError::validation_with_context(
            format!("Failed to parse SPARQL results: {}", e),
            ErrorContext::new("select").with_entity("sparql"),
        )
    })?;
    Ok(parsed.results.bindings)
}

const COVERAGE_GRAPH: &str = "https://lindas.admin.ch/elcom/electricityprice";
const COVERAGE_CUBE: &str = "https://energy.ld.admin.ch/elcom/electricityprice-coverage";

/// SPARQL query returning every coverage record of a reporting year.
pub fn coverage_query(period: Period) -> String {
    format!(
        r#"PREFIX cube: <https://cube.link/>
PREFIX elcom: <https://energy.ld.admin.ch/elcom/electricityprice/dimension/>
SELECT ?municipality ?operator ?network_level ?coverage_ratio
FROM <{graph}>
WHERE {{
  <{cube}> cube:observationSet/cube:observation ?obs .
  ?obs elcom:period "{year}"^^<http://www.w3.org/2001/XMLSchema#gYear> ;
       elcom:municipality ?municipality ;
       elcom:operator ?operator ;
       elcom:network_level ?network_level ;
       elcom:coverage_ratio ?coverage_ratio .
}}"#,
        graph = COVERAGE_GRAPH,
        cube = COVERAGE_CUBE,
        year = period.value(),
    )
}

/// Raw query access to the triple store.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one client is shared by every
/// request through the coverage cache.
#[async_trait]
pub trait SparqlClient: Send + Sync {
    /// Run a `SELECT` query and return its bindings.
    ///
    /// Transport and endpoint failures are returned unchanged; callers decide
    /// whether to retry.
    async fn select(&self, query: &str) -> RepositoryResult<Vec<SparqlRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sparql_json() {
        let body = r#"{
            "head": { "vars": ["municipality", "coverage_ratio"] },
            "results": { "bindings": [
                {
                    "municipality": { "type": "uri", "value": "https://ld.admin.ch/municipality/261" },
                    "coverage_ratio": { "type": "literal", "value": "0.5",
                        "datatype": "http://www.w3.org/2001/XMLSchema#decimal" }
                },
                { "municipality": { "type": "uri", "value": "https://ld.admin.ch/municipality/1" } }
            ] }
        }"#;

        let rows = parse_sparql_json(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["coverage_ratio"].value, "0.5");
        assert_eq!(rows[0]["municipality"].kind.as_deref(), Some("uri"));
        assert!(!rows[1].contains_key("coverage_ratio"));
    }

    #[test]
    fn test_parse_sparql_json_rejects_garbage() {
        let err = parse_sparql_json("<html>502</html>").unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }
}
