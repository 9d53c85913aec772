//! Similarity providers
//!
//! A flat capability interface over external similar-artist sources. Every
//! provider absorbs its own upstream failures into an empty list; only
//! cancellation surfaces as an error.

pub mod lastfm;
pub mod listenbrainz;

pub use lastfm::LastFmProvider;
pub use listenbrainz::ListenBrainzProvider;

use crate::discovery::models::CandidateResult;
use crate::http::HttpError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider call cancelled")]
    Cancelled,

    #[error("Provider failed: {0}")]
    Failed(String),
}

/// External similar-artist source
#[async_trait::async_trait]
pub trait SimilarityProvider: Send + Sync {
    /// Tag attached to every result and cache row
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    /// Similar artists for one library artist
    ///
    /// `mbid` is the library artist's MusicBrainz ID when already known.
    async fn get_similar_artists(
        &self,
        name: &str,
        mbid: Option<&str>,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<CandidateResult>, ProviderError>;
}

/// Absorb an upstream failure into an empty result, keeping cancellation
pub(crate) fn absorb_failure(
    provider: &str,
    artist: &str,
    err: HttpError,
) -> Result<Vec<CandidateResult>, ProviderError> {
    if err.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }

    tracing::warn!(provider, artist = %artist, error = %err, "Similarity provider failed");
    Ok(Vec::new())
}
