//! Last.fm similarity provider (API key required)

use super::{absorb_failure, ProviderError, SimilarityProvider};
use crate::clients::LastFmClient;
use crate::discovery::models::CandidateResult;
use tokio_util::sync::CancellationToken;

pub const LASTFM_PROVIDER: &str = "lastfm";

pub struct LastFmProvider {
    client: LastFmClient,
}

impl LastFmProvider {
    pub fn new(client: LastFmClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SimilarityProvider for LastFmProvider {
    fn name(&self) -> &str {
        LASTFM_PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.client.has_api_key()
    }

    async fn get_similar_artists(
        &self,
        name: &str,
        _mbid: Option<&str>,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        match self.client.get_similar_artists(name, limit, cancel).await {
            Ok(artists) => Ok(artists
                .into_iter()
                .map(|artist| CandidateResult::new(artist.name, artist.score, artist.mbid, LASTFM_PROVIDER))
                .collect()),
            Err(err) => absorb_failure(LASTFM_PROVIDER, name, err),
        }
    }
}
