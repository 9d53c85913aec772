//! Last.fm API client (`artist.getsimilar`)

use crate::http::{self, HttpError, RetryPolicy};
use serde::{Deserialize, Deserializer};
use tokio_util::sync::CancellationToken;

pub const LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm rate-limits aggressively; one retry is enough
const LASTFM_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Deserialize)]
struct SimilarArtistsResponse {
    #[serde(default)]
    error: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    similarartists: Option<SimilarArtistsList>,
}

#[derive(Debug, Deserialize)]
struct SimilarArtistsList {
    #[serde(default)]
    artist: Vec<LastFmSimilarArtist>,
}

/// One entry of `similarartists.artist`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LastFmSimilarArtist {
    pub name: String,
    /// Similarity 0-1 (sent as a string)
    #[serde(rename = "match", deserialize_with = "score_from_string")]
    pub score: f64,
    #[serde(default)]
    pub mbid: Option<String>,
}

/// Last.fm sends numbers as strings; accept both
fn score_from_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(value) => value,
        Raw::Text(text) => text.trim().parse().unwrap_or(0.0),
    })
}

pub struct LastFmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl LastFmClient {
    pub fn new(user_agent: &str, api_key: &str) -> Result<Self, HttpError> {
        Self::with_base_url(user_agent, api_key, LASTFM_BASE_URL)
    }

    pub fn with_base_url(user_agent: &str, api_key: &str, base_url: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http_client: http::build_client(user_agent)?,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            retry: RetryPolicy::default().with_max_attempts(LASTFM_MAX_ATTEMPTS),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Similar artists for `artist`, best match first
    ///
    /// An error payload (unknown artist, bad key) yields an empty list.
    pub async fn get_similar_artists(
        &self,
        artist: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<LastFmSimilarArtist>, HttpError> {
        let limit = limit.to_string();
        let query = [
            ("method", "artist.getsimilar"),
            ("artist", artist),
            ("api_key", self.api_key.as_str()),
            ("limit", limit.as_str()),
            ("format", "json"),
        ];

        let response: SimilarArtistsResponse = self
            .retry
            .execute("lastfm artist.getsimilar", cancel, || async {
                http::send_json(self.http_client.get(&self.base_url).query(&query)).await
            })
            .await?;

        if let Some(code) = response.error {
            tracing::warn!(
                artist = %artist,
                code,
                message = response.message.as_deref().unwrap_or(""),
                "Last.fm returned an error payload"
            );
            return Ok(Vec::new());
        }

        Ok(response
            .similarartists
            .map(|list| list.artist)
            .unwrap_or_default())
    }
}
