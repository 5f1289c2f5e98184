//! Input boundary: query interfaces, their implementations and configuration.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Services (coverage cache, enrichment builders)         │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Traits (repository/) - SparqlClient,                   │
//! │  ObservationRepository                                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────┐
//!     │                                  │
//! ┌───▼──────────────┐      ┌────────────▼─────────┐
//! │ HttpSparqlClient │      │   LocalRepository    │
//! │  (sparql-repo)   │      │     (in-memory)      │
//! └──────────────────┘      └──────────────────────┘
//! ```
//!
//! Nothing here is a global: build clients through [`RepositoryFactory`] and
//! pass them to [`crate::state::AppState`]. With only `local-repo` enabled,
//! [`RepositoryFactory::create_selected`] yields the in-memory backend.

#[cfg(not(any(feature = "sparql-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::{RepositoryConfig, SparqlConfig, DEFAULT_SPARQL_ENDPOINT};
#[cfg(feature = "sparql-repo")]
pub use repositories::HttpSparqlClient;
pub use repositories::LocalRepository;
pub use repository::{
    ErrorContext, ObservationRepository, RepositoryError, RepositoryResult, SparqlClient,
    SparqlRow, SparqlTerm,
};
