//! MusicBrainz API client
//!
//! Naming registry (artist search), detail registry (release-group search),
//! and recording resolution. All calls share one rate limiter.

use crate::http::{self, HttpError, RateLimiter, RetryPolicy};
use crate::types::{
    release_year, AlbumInfo, ArtistMatch, DetailRegistry, NamingRegistry, RecordingInfo,
    RecordingResolver, ReleaseGroup,
};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second
const RECORDING_INCLUDES: &str = "artists+releases+release-groups";

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<ArtistMatch>,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroupSearchResponse {
    #[serde(rename = "release-groups", default)]
    release_groups: Vec<ReleaseGroup>,
}

/// GET /recording/{mbid}?inc=artists+releases+release-groups
#[derive(Debug, Clone, Deserialize)]
pub struct MBRecordingLookup {
    pub title: String,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MBArtistCredit>,
    #[serde(default)]
    pub releases: Vec<MBRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MBArtistCredit {
    /// Credited name (may differ from artist.name)
    #[serde(default)]
    pub name: Option<String>,
    pub artist: MBCreditedArtist,
    #[serde(default)]
    pub joinphrase: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MBCreditedArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MBRelease {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "release-group", default)]
    pub release_group: Option<ReleaseGroup>,
}

impl MBRecordingLookup {
    /// Artist credit rendered the way MusicBrainz displays it
    pub fn artist_name(&self) -> String {
        self.artist_credit
            .iter()
            .map(|credit| {
                let name = credit.name.as_deref().unwrap_or(&credit.artist.name);
                format!("{}{}", name, credit.joinphrase.as_deref().unwrap_or(""))
            })
            .collect()
    }

    /// Release on an Album-type release group if there is one, else the first release
    pub fn preferred_release(&self) -> Option<&MBRelease> {
        self.releases
            .iter()
            .find(|release| {
                release
                    .release_group
                    .as_ref()
                    .and_then(|rg| rg.primary_type.as_deref())
                    == Some("Album")
            })
            .or_else(|| self.releases.first())
    }
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl MusicBrainzClient {
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        Self::with_base_url(user_agent, MUSICBRAINZ_BASE_URL)
    }

    pub fn with_base_url(user_agent: &str, base_url: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http_client: http::build_client(user_agent)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(Duration::from_millis(RATE_LIMIT_MS)),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the request spacing (tests use zero)
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(min_interval);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        label: &str,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, HttpError> {
        let url = format!("{}/{}", self.base_url, path);

        self.retry
            .execute(label, cancel, || async {
                self.rate_limiter.wait(cancel).await?;
                tracing::debug!(url = %url, "Querying MusicBrainz API");
                http::send_json(self.http_client.get(&url).query(query)).await
            })
            .await
    }

    /// Look up a recording with its artists, releases and release groups
    pub async fn lookup_recording(
        &self,
        mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<MBRecordingLookup, HttpError> {
        self.get_json(
            "musicbrainz recording lookup",
            &format!("recording/{}", mbid),
            &[
                ("inc", RECORDING_INCLUDES.to_string()),
                ("fmt", "json".to_string()),
            ],
            cancel,
        )
        .await
    }

    /// Lookup that maps permanent API failures (404 and friends) to `None`
    async fn lookup_recording_opt(
        &self,
        mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<MBRecordingLookup>, HttpError> {
        match self.lookup_recording(mbid, cancel).await {
            Ok(recording) => Ok(Some(recording)),
            Err(err) if err.is_cancelled() || err.is_transient() => Err(err),
            Err(err) => {
                tracing::warn!(mbid = %mbid, error = %err, "Recording lookup failed");
                Ok(None)
            }
        }
    }
}

#[async_trait::async_trait]
impl NamingRegistry for MusicBrainzClient {
    async fn search_artists(
        &self,
        name: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArtistMatch>, HttpError> {
        let response: ArtistSearchResponse = self
            .get_json(
                "musicbrainz artist search",
                "artist",
                &[
                    ("query", name.to_string()),
                    ("limit", limit.to_string()),
                    ("fmt", "json".to_string()),
                ],
                cancel,
            )
            .await?;

        Ok(response.artists)
    }
}

#[async_trait::async_trait]
impl DetailRegistry for MusicBrainzClient {
    async fn search_release_groups(
        &self,
        artist: &str,
        primary_type: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleaseGroup>, HttpError> {
        let query = format!(
            "artist:\"{}\" AND primarytype:{}",
            artist.replace('"', "\\\""),
            primary_type
        );

        let response: ReleaseGroupSearchResponse = self
            .get_json(
                "musicbrainz release-group search",
                "release-group",
                &[
                    ("query", query),
                    ("limit", limit.to_string()),
                    ("fmt", "json".to_string()),
                ],
                cancel,
            )
            .await?;

        Ok(response.release_groups)
    }
}

#[async_trait::async_trait]
impl RecordingResolver for MusicBrainzClient {
    async fn resolve_recording(
        &self,
        mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<RecordingInfo>, HttpError> {
        let Some(recording) = self.lookup_recording_opt(mbid, cancel).await? else {
            return Ok(None);
        };

        let release_group_mbid = recording
            .preferred_release()
            .and_then(|release| release.release_group.as_ref())
            .map(|rg| rg.id.clone());

        Ok(Some(RecordingInfo {
            artist: recording.artist_name(),
            title: recording.title.clone(),
            mbid: mbid.to_string(),
            release_group_mbid,
        }))
    }

    async fn resolve_recording_to_album(
        &self,
        mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AlbumInfo>, HttpError> {
        let Some(recording) = self.lookup_recording_opt(mbid, cancel).await? else {
            return Ok(None);
        };

        let Some(release) = recording.preferred_release() else {
            tracing::debug!(mbid = %mbid, "Recording has no releases");
            return Ok(None);
        };
        let Some(group) = release.release_group.as_ref() else {
            return Ok(None);
        };

        let year = group
            .year()
            .or_else(|| release_year(release.date.as_deref()));

        Ok(Some(AlbumInfo {
            artist: recording.artist_name(),
            title: group.title.clone(),
            mbid: group.id.clone(),
            recording_mbid: mbid.to_string(),
            track_title: recording.title.clone(),
            year,
        }))
    }
}
