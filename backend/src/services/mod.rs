//! Service layer: coverage filtering, color encodings, enrichment and selection.
//!
//! Data flows from the repositories through the enrichment builders, is
//! filtered by coverage, classified by a color encoding and finally picked
//! apart by the selection resolver.

pub mod coverage;
pub mod enrichment;
pub mod load_state;
pub mod map_encodings;
pub mod selection;

pub use coverage::{CoverageCache, CoverageCacheStats, CoverageRecord, CoverageYear};
pub use enrichment::{
    enrich_energy_prices, enrich_sunshine, EnrichedDataLoader, EnrichedEnergyPricesData,
    EnrichedSunshineData, EnrichmentMemo,
};
pub use load_state::LoadState;
pub use map_encodings::{ColorEncoding, ColorScale, EncodingKind};
pub use selection::{resolve, EnrichedData, EntitySelection, ResolvedSelection};
