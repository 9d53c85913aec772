//! scout-discovery library interface
//!
//! Finds new music to review:
//! - **Catalog discovery:** artists similar to the library, ranked across
//!   providers, with their albums queued for approval
//! - **Recommendations:** ListenBrainz recordings resolved to tracks or albums
//!
//! Both jobs are driven through the collaborator traits in [`types`] and
//! [`db`], and are invoked once per scheduler tick by the binary.

pub mod clients;
pub mod db;
pub mod discovery;
pub mod error;
pub mod http;
pub mod jobs;
pub mod providers;
pub mod recommendations;
pub mod types;

pub use crate::error::{DiscoveryError, DiscoveryResult, JobOutcome};
pub use crate::jobs::{JobRegistry, CATALOG_DISCOVERY_JOB, LISTENBRAINZ_FETCH_JOB};
