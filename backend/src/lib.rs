//! # ElCom Rust Backend
//!
//! Data enrichment and coverage filtering for Swiss electricity tariffs and
//! grid-operator "sunshine" indicators.
//!
//! The crate sits between the LINDAS query layer and a rendering layer. It
//! fetches raw observations, filters them by operator coverage, classifies
//! values into map colors and resolves the entity a user is looking at.
//!
//! ## Architecture
//!
//! - [`api`]: identifier newtypes, shared enums and raw observation records
//! - [`db`]: query traits, the HTTP SPARQL client, the in-memory repository and configuration
//! - [`services`]: coverage cache, color encodings, enrichment builders, selection resolver
//! - [`state`]: process-wide [`state::AppState`]
//! - [`logging`]: tracing subscriber setup
//!
//! ## Example
//!
//! ```
//! use elcom_rust::api::{EnergyPricesQuery, Period};
//! use elcom_rust::db::LocalRepository;
//! use elcom_rust::state::AppState;
//!
//! let state = AppState::local(LocalRepository::new());
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let query = EnergyPricesQuery::new(Period::new(2024), "H4");
//! let data = runtime.block_on(state.loader.energy_prices(&query));
//! assert!(data.is_ready());
//! ```

// RepositoryError carries a rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
