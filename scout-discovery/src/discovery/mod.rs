//! Catalog discovery: cache partitioning, fan-out fetch, aggregation,
//! ranking, and the job that drives them

pub mod aggregate;
pub mod cache;
pub mod fanout;
pub mod models;
pub mod orchestrator;
pub mod ranking;

pub use models::{AggregatedCandidate, CandidateResult, CatalogArtist, DiscoveryReport};
pub use orchestrator::{CatalogDiscoveryJob, DiscoveryCollaborators, DiscoveryPhase};
