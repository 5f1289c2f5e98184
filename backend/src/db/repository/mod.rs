//! Repository traits for the upstream query layer.
//!
//! - [`SparqlClient`]: raw `SELECT` access to the triple store (coverage ratios)
//! - [`ObservationRepository`]: typed observation and reference queries

pub mod error;
pub mod observations;
pub mod sparql;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use observations::ObservationRepository;
pub use sparql::{coverage_query, parse_sparql_json, SparqlClient, SparqlRow, SparqlTerm};
