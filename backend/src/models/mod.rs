//! Domain records flowing from the query layer into the enrichment builders.

pub mod observation;

pub use observation::*;
