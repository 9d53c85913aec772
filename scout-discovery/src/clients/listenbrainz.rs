//! ListenBrainz API client
//!
//! - Labs similar-artist dataset (token-free, MBID keyed)
//! - Collaborative-filtering recording recommendations (token required)
//! - Playlists generated for a user (weekly exploration)

use crate::http::{self, HttpError, RetryPolicy};
use crate::types::RecommendationFeed;
use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::sync::CancellationToken;

pub const LISTENBRAINZ_API_URL: &str = "https://api.listenbrainz.org";
pub const LISTENBRAINZ_LABS_URL: &str = "https://labs.api.listenbrainz.org";

const SIMILAR_ARTISTS_ALGORITHM: &str =
    "session_based_days_9000_session_300_contribution_5_threshold_15_limit_50_skip_30";
const PLAYLISTS_PAGE_SIZE: u32 = 25;

#[derive(Debug, Serialize)]
struct SimilarArtistsRequest<'a> {
    artist_mbids: [&'a str; 1],
    algorithm: &'a str,
}

#[derive(Debug, Deserialize)]
struct SimilarArtistsEntry {
    #[serde(default)]
    similar_artists: Vec<LbSimilarArtist>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LbSimilarArtist {
    pub artist_mbid: String,
    pub name: String,
    pub score: f64,
}

/// One collaborative-filtering recommendation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recommendation {
    pub recording_mbid: String,
    /// Absent for playlist-sourced recordings
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    payload: RecommendationPayload,
}

#[derive(Debug, Deserialize)]
struct RecommendationPayload {
    #[serde(default)]
    mbids: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    playlists: Vec<PlaylistWrapper>,
}

#[derive(Debug, Deserialize)]
struct PlaylistWrapper {
    playlist: PlaylistMetadata,
}

/// Playlist header as listed under `playlists/createdfor`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaylistMetadata {
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// GET /1/playlist/{mbid}
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResponse {
    pub playlist: Playlist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Playlist {
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub track: Vec<PlaylistTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrack {
    /// JSPF allows a single identifier or a list
    #[serde(deserialize_with = "one_or_many")]
    pub identifier: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(value) => vec![value],
        Raw::Many(values) => values,
    })
}

/// Trailing `/<kind>/<id>` segment of a URL, where `id` is hex digits and dashes
fn extract_trailing_id(identifier: &str, kind: &str, case_insensitive: bool) -> Option<String> {
    let marker = format!("/{}/", kind);
    let haystack = if case_insensitive {
        identifier.to_ascii_lowercase()
    } else {
        identifier.to_string()
    };

    let start = haystack.rfind(&marker)? + marker.len();
    let id = &identifier[start..];

    let valid = !id.is_empty()
        && id.chars().all(|c| {
            c == '-'
                || c.is_ascii_digit()
                || ('a'..='f').contains(&c)
                || (case_insensitive && ('A'..='F').contains(&c))
        });

    valid.then(|| id.to_string())
}

/// `https://musicbrainz.org/recording/<mbid>` → `<mbid>`
pub fn extract_recording_mbid(identifier: &str) -> Option<String> {
    extract_trailing_id(identifier, "recording", false)
}

/// `https://listenbrainz.org/playlist/<mbid>` → `<mbid>`
pub fn extract_playlist_mbid(identifier: &str) -> Option<String> {
    extract_trailing_id(identifier, "playlist", true)
}

fn is_weekly_exploration(playlist: &PlaylistMetadata) -> bool {
    playlist.identifier.contains("weekly-exploration")
        || playlist.title.to_lowercase().contains("weekly exploration")
}

pub struct ListenBrainzClient {
    http_client: reqwest::Client,
    api_url: String,
    labs_url: String,
    retry: RetryPolicy,
}

impl ListenBrainzClient {
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        Self::with_base_urls(user_agent, LISTENBRAINZ_API_URL, LISTENBRAINZ_LABS_URL)
    }

    pub fn with_base_urls(user_agent: &str, api_url: &str, labs_url: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http_client: http::build_client(user_agent)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            labs_url: labs_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Artists similar to `artist_mbid`, truncated to `limit`
    ///
    /// An error entry in the payload yields an empty list.
    pub async fn get_similar_artists(
        &self,
        artist_mbid: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<LbSimilarArtist>, HttpError> {
        let url = format!("{}/similar-artists/json", self.labs_url);
        let body = [SimilarArtistsRequest {
            artist_mbids: [artist_mbid],
            algorithm: SIMILAR_ARTISTS_ALGORITHM,
        }];

        let entries: Vec<SimilarArtistsEntry> = self
            .retry
            .execute("listenbrainz similar-artists", cancel, || async {
                http::send_json(self.http_client.post(&url).json(&body)).await
            })
            .await?;

        let Some(entry) = entries.into_iter().next() else {
            return Ok(Vec::new());
        };

        if let Some(error) = entry.error {
            tracing::debug!(artist_mbid = %artist_mbid, error = %error, "No similar artists");
            return Ok(Vec::new());
        }

        let mut artists = entry.similar_artists;
        artists.truncate(limit);
        Ok(artists)
    }

    /// Collaborative-filtering recommendations for `username`
    ///
    /// 204 (no recommendations yet) and non-retryable HTTP errors yield an
    /// empty list; exhausted transient retries are returned as errors.
    pub async fn fetch_recommendations(
        &self,
        username: &str,
        token: &str,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError> {
        let url = format!("{}/1/cf/recommendation/user/{}/recording", self.api_url, username);
        let auth = format!("Token {}", token);
        let count = count.to_string();

        let result = self
            .retry
            .execute("listenbrainz recommendations", cancel, || async {
                let response = self
                    .http_client
                    .get(&url)
                    .header(reqwest::header::AUTHORIZATION, &auth)
                    .query(&[("count", count.as_str())])
                    .send()
                    .await?;

                if response.status() == reqwest::StatusCode::NO_CONTENT {
                    return Ok(None);
                }

                let response = http::check_status(response).await?;
                response
                    .json::<RecommendationResponse>()
                    .await
                    .map(Some)
                    .map_err(|e| HttpError::Decode(e.to_string()))
            })
            .await;

        match result {
            Ok(Some(response)) => Ok(response.payload.mbids),
            Ok(None) => {
                tracing::info!(username = %username, "No recommendations available yet");
                Ok(Vec::new())
            }
            Err(err) => absorb_permanent(err, Vec::new(), "Fetching recommendations failed"),
        }
    }

    /// Playlists ListenBrainz generated for `username`
    pub async fn fetch_playlists_created_for(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlaylistMetadata>, HttpError> {
        let url = format!("{}/1/user/{}/playlists/createdfor", self.api_url, username);
        let count = PLAYLISTS_PAGE_SIZE.to_string();

        let result: Result<PlaylistsResponse, HttpError> = self
            .retry
            .execute("listenbrainz playlists", cancel, || async {
                http::send_json(self.http_client.get(&url).query(&[("count", count.as_str())])).await
            })
            .await;

        match result {
            Ok(response) => Ok(response.playlists.into_iter().map(|p| p.playlist).collect()),
            Err(err) => absorb_permanent(err, Vec::new(), "Fetching playlists failed"),
        }
    }

    /// Full playlist with tracks; `None` on a non-retryable HTTP error
    pub async fn fetch_playlist(
        &self,
        playlist_mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PlaylistResponse>, HttpError> {
        let url = format!("{}/1/playlist/{}", self.api_url, playlist_mbid);

        let result: Result<PlaylistResponse, HttpError> = self
            .retry
            .execute("listenbrainz playlist", cancel, || async {
                http::send_json(self.http_client.get(&url)).await
            })
            .await;

        match result {
            Ok(response) => Ok(Some(response)),
            Err(err) => absorb_permanent(err, None, "Fetching playlist failed"),
        }
    }

    /// First generated playlist that looks like a weekly exploration
    pub async fn find_weekly_exploration_playlist(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PlaylistMetadata>, HttpError> {
        let playlists = self.fetch_playlists_created_for(username, cancel).await?;
        Ok(playlists.into_iter().find(is_weekly_exploration))
    }
}

/// First recording MBID of every track, in playlist order
fn playlist_recordings(playlist: &Playlist) -> Vec<Recommendation> {
    playlist
        .track
        .iter()
        .filter_map(|track| {
            track
                .identifier
                .iter()
                .find_map(|id| extract_recording_mbid(id))
        })
        .map(|recording_mbid| Recommendation {
            recording_mbid,
            score: None,
        })
        .collect()
}

#[async_trait::async_trait]
impl RecommendationFeed for ListenBrainzClient {
    async fn collaborative(
        &self,
        username: &str,
        token: &str,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError> {
        self.fetch_recommendations(username, token, count, cancel).await
    }

    async fn weekly_playlist(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError> {
        let Some(metadata) = self.find_weekly_exploration_playlist(username, cancel).await? else {
            tracing::info!(username = %username, "No weekly exploration playlist found");
            return Ok(Vec::new());
        };

        let Some(playlist_mbid) = extract_playlist_mbid(&metadata.identifier) else {
            tracing::warn!(identifier = %metadata.identifier, "Unrecognised playlist identifier");
            return Ok(Vec::new());
        };

        let Some(response) = self.fetch_playlist(&playlist_mbid, cancel).await? else {
            return Ok(Vec::new());
        };

        let recordings = playlist_recordings(&response.playlist);
        tracing::info!(
            playlist = %response.playlist.title,
            recordings = recordings.len(),
            "Weekly exploration playlist loaded"
        );
        Ok(recordings)
    }
}

/// Non-retryable API failures become `fallback`; cancellation and exhausted
/// transient failures propagate
fn absorb_permanent<T>(err: HttpError, fallback: T, context: &str) -> Result<T, HttpError> {
    if err.is_cancelled() || err.is_transient() {
        return Err(err);
    }

    tracing::warn!(error = %err, "{}", context);
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_recording_mbid() {
        assert_eq!(
            extract_recording_mbid("https://musicbrainz.org/recording/abc-123-def-456"),
            Some("abc-123-def-456".to_string())
        );
        assert_eq!(extract_recording_mbid("https://musicbrainz.org/recording/abc-123/"), None);
        assert_eq!(extract_recording_mbid("https://musicbrainz.org/release/abc-123"), None);
        assert_eq!(extract_recording_mbid("https://musicbrainz.org/recording/rec-1"), None);
    }

    #[test]
    fn test_extract_playlist_mbid_case_insensitive() {
        assert_eq!(
            extract_playlist_mbid("https://listenbrainz.org/playlist/ABC-123"),
            Some("ABC-123".to_string())
        );
        assert_eq!(extract_playlist_mbid("https://listenbrainz.org/user/alice"), None);
    }

    #[test]
    fn test_weekly_exploration_match() {
        let by_title = PlaylistMetadata {
            identifier: "https://listenbrainz.org/playlist/abc-123".into(),
            title: "Weekly Exploration for alice".into(),
            creator: None,
            date: None,
        };
        let by_identifier = PlaylistMetadata {
            identifier: "https://listenbrainz.org/playlist/weekly-exploration-1".into(),
            title: "Something".into(),
            creator: None,
            date: None,
        };
        let other = PlaylistMetadata {
            identifier: "https://listenbrainz.org/playlist/def-456".into(),
            title: "Daily Jams".into(),
            creator: None,
            date: None,
        };

        assert!(is_weekly_exploration(&by_title));
        assert!(is_weekly_exploration(&by_identifier));
        assert!(!is_weekly_exploration(&other));
    }

    #[test]
    fn test_track_identifier_one_or_many() {
        let single: PlaylistTrack =
            serde_json::from_str(r#"{"identifier":"https://musicbrainz.org/recording/abc"}"#).unwrap();
        assert_eq!(single.identifier.len(), 1);

        let many: PlaylistTrack = serde_json::from_str(
            r#"{"identifier":["https://example.com/x","https://musicbrainz.org/recording/abc"]}"#,
        )
        .unwrap();
        assert_eq!(many.identifier.len(), 2);
    }

    #[test]
    fn test_playlist_recordings_takes_first_recording_per_track() {
        let json = r#"{
            "identifier": "https://listenbrainz.org/playlist/0a1b",
            "title": "Weekly Exploration for alice",
            "track": [
                {"identifier": ["https://example.org/x", "https://musicbrainz.org/recording/aaa-111"]},
                {"identifier": "https://musicbrainz.org/recording/bbb-222"},
                {"identifier": ["https://example.org/no-recording"]}
            ]
        }"#;
        let playlist: Playlist = serde_json::from_str(json).unwrap();

        let ids: Vec<String> = playlist_recordings(&playlist)
            .into_iter()
            .map(|r| r.recording_mbid)
            .collect();
        assert_eq!(ids, vec!["aaa-111", "bbb-222"]);
    }

    #[test]
    fn test_request_body_shape() {
        let body = [SimilarArtistsRequest {
            artist_mbids: ["mbid-1"],
            algorithm: SIMILAR_ARTISTS_ALGORITHM,
        }];
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json[0]["artist_mbids"][0], "mbid-1");
        assert_eq!(json[0]["algorithm"], SIMILAR_ARTISTS_ALGORITHM);
    }

    #[test]
    fn test_absorb_permanent() {
        let not_found = HttpError::Status {
            status: 404,
            body: String::new(),
        };
        assert_eq!(absorb_permanent(not_found, 7, "ctx").unwrap(), 7);

        let busy = HttpError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(absorb_permanent(busy, 7, "ctx").is_err());
        assert!(absorb_permanent(HttpError::Cancelled, 7, "ctx").is_err());
    }
}
