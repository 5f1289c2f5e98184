//! Repository implementations module.
//!
//! - `local`: In-memory implementation for unit testing and local development
//! - `sparql`: SPARQL-over-HTTP client for the LINDAS endpoint
pub mod local;
#[cfg(feature = "sparql-repo")]
pub mod sparql;

pub use local::LocalRepository;
#[cfg(feature = "sparql-repo")]
pub use sparql::HttpSparqlClient;
