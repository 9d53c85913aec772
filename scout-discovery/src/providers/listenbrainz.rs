//! ListenBrainz similarity provider (no token, MBID keyed)
//!
//! Library artists without a known MBID are resolved by name once per
//! provider instance; the resolution is cached by normalized name.

use super::{absorb_failure, ProviderError, SimilarityProvider};
use crate::clients::ListenBrainzClient;
use crate::discovery::models::CandidateResult;
use crate::http::HttpError;
use crate::types::NamingRegistry;
use scout_common::normalize_name;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub const LISTENBRAINZ_PROVIDER: &str = "listenbrainz";

pub struct ListenBrainzProvider {
    client: ListenBrainzClient,
    naming: Arc<dyn NamingRegistry>,
    resolved_mbids: Mutex<HashMap<String, String>>,
}

impl ListenBrainzProvider {
    pub fn new(client: ListenBrainzClient, naming: Arc<dyn NamingRegistry>) -> Self {
        Self {
            client,
            naming,
            resolved_mbids: Mutex::new(HashMap::new()),
        }
    }

    fn cached_mbid(&self, key: &str) -> Option<String> {
        self.resolved_mbids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn remember_mbid(&self, key: String, mbid: String) {
        self.resolved_mbids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, mbid);
    }

    /// Known MBID, cached resolution, or a fresh naming-registry lookup
    async fn resolve_mbid(
        &self,
        name: &str,
        mbid: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, HttpError> {
        if let Some(mbid) = mbid.filter(|m| !m.is_empty()) {
            return Ok(Some(mbid.to_string()));
        }

        let key = normalize_name(name);
        if let Some(mbid) = self.cached_mbid(&key) {
            return Ok(Some(mbid));
        }

        let matches = self.naming.search_artists(name, 1, cancel).await?;
        let Some(first) = matches.into_iter().next() else {
            tracing::debug!(artist = %name, "No MBID match; skipping ListenBrainz");
            return Ok(None);
        };

        self.remember_mbid(key, first.mbid.clone());
        Ok(Some(first.mbid))
    }
}

#[async_trait::async_trait]
impl SimilarityProvider for ListenBrainzProvider {
    fn name(&self) -> &str {
        LISTENBRAINZ_PROVIDER
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn get_similar_artists(
        &self,
        name: &str,
        mbid: Option<&str>,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        let artist_mbid = match self.resolve_mbid(name, mbid, cancel).await {
            Ok(Some(mbid)) => mbid,
            Ok(None) => return Ok(Vec::new()),
            Err(err) => return absorb_failure(LISTENBRAINZ_PROVIDER, name, err),
        };

        match self
            .client
            .get_similar_artists(&artist_mbid, limit as usize, cancel)
            .await
        {
            Ok(artists) => Ok(artists
                .into_iter()
                .map(|artist| {
                    CandidateResult::new(
                        artist.name,
                        artist.score,
                        Some(artist.artist_mbid),
                        LISTENBRAINZ_PROVIDER,
                    )
                })
                .collect()),
            Err(err) => absorb_failure(LISTENBRAINZ_PROVIDER, name, err),
        }
    }
}
