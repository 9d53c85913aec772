//! External collaborator types and trait definitions
//!
//! The discovery and recommendation jobs talk to the outside world only
//! through these traits, so tests can drive them with in-memory fakes:
//! - **Registries:** source library, naming (artist MBIDs), detail
//!   (release groups), recording resolution, cover art
//! - **Job control:** whether a sibling job currently holds the shared
//!   rate-limited dependency

use crate::clients::listenbrainz::Recommendation;
use crate::http::HttpError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Registry data
// ============================================================================

/// Artist as listed by the source library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArtist {
    pub id: String,
    pub name: String,
}

/// Naming registry search hit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArtistMatch {
    #[serde(rename = "id")]
    pub mbid: String,
    pub name: String,
    #[serde(default)]
    pub score: Option<u32>,
}

/// Release group returned by the detail registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReleaseGroup {
    pub id: String,
    pub title: String,
    #[serde(rename = "primary-type", default)]
    pub primary_type: Option<String>,
    #[serde(rename = "first-release-date", default)]
    pub first_release_date: Option<String>,
}

impl ReleaseGroup {
    /// Year parsed from the first four characters of the release date
    pub fn year(&self) -> Option<i32> {
        release_year(self.first_release_date.as_deref())
    }
}

/// Parse `YYYY...` into a year
pub fn release_year(date: Option<&str>) -> Option<i32> {
    let date = date?;
    date.get(..4)?.parse().ok()
}

/// Track-level resolution of a recording MBID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingInfo {
    pub artist: String,
    pub title: String,
    pub mbid: String,
    /// Release group to use for cover art
    pub release_group_mbid: Option<String>,
}

/// Album-level resolution of a recording MBID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumInfo {
    pub artist: String,
    pub title: String,
    /// Release group MBID
    pub mbid: String,
    pub recording_mbid: String,
    pub track_title: String,
    pub year: Option<i32>,
}

// ============================================================================
// Registry traits
// ============================================================================

/// Library the discovery job treats as "already owned"
#[async_trait::async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn list_artists(&self, cancel: &CancellationToken)
        -> Result<Vec<SourceArtist>, HttpError>;
}

/// Name → MBID resolver
#[async_trait::async_trait]
pub trait NamingRegistry: Send + Sync {
    async fn search_artists(
        &self,
        name: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<ArtistMatch>, HttpError>;
}

/// Release group lookup for an artist
#[async_trait::async_trait]
pub trait DetailRegistry: Send + Sync {
    async fn search_release_groups(
        &self,
        artist: &str,
        primary_type: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleaseGroup>, HttpError>;
}

/// Recording MBID → track or album
#[async_trait::async_trait]
pub trait RecordingResolver: Send + Sync {
    async fn resolve_recording(
        &self,
        mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<RecordingInfo>, HttpError>;

    async fn resolve_recording_to_album(
        &self,
        mbid: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AlbumInfo>, HttpError>;
}

/// Recording recommendations for one user
#[async_trait::async_trait]
pub trait RecommendationFeed: Send + Sync {
    /// Collaborative-filtering recommendations, with scores
    async fn collaborative(
        &self,
        username: &str,
        token: &str,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError>;

    /// Recordings of the user's weekly exploration playlist, unscored
    async fn weekly_playlist(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError>;
}

/// Cover image lookup; implementations must not block on the network
pub trait CoverArt: Send + Sync {
    fn cover_url(&self, release_group_mbid: &str) -> Option<String>;
}

// ============================================================================
// Job control
// ============================================================================

/// Visibility into sibling jobs
#[async_trait::async_trait]
pub trait JobControl: Send + Sync {
    async fn is_running(&self, job_name: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_year() {
        assert_eq!(release_year(Some("1997-05-21")), Some(1997));
        assert_eq!(release_year(Some("2003")), Some(2003));
        assert_eq!(release_year(Some("19")), None);
        assert_eq!(release_year(Some("abcd-01")), None);
        assert_eq!(release_year(None), None);
    }

    #[test]
    fn test_release_group_deserializes_hyphenated_fields() {
        let json = r#"{"id":"rg-1","title":"OK Computer","primary-type":"Album","first-release-date":"1997-05-21"}"#;
        let group: ReleaseGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.primary_type.as_deref(), Some("Album"));
        assert_eq!(group.year(), Some(1997));
    }
}
