//! In-memory collaborators for driving the jobs without a network

use scout_common::normalize_name;
use scout_discovery::clients::listenbrainz::Recommendation;
use scout_discovery::discovery::CandidateResult;
use scout_discovery::http::HttpError;
use scout_discovery::providers::{ProviderError, SimilarityProvider};
use scout_discovery::types::{
    AlbumInfo, ArtistMatch, CoverArt, DetailRegistry, JobControl, NamingRegistry,
    RecommendationFeed, RecordingInfo, RecordingResolver, ReleaseGroup, SourceArtist,
    SourceRegistry,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

fn api_error(what: &str) -> HttpError {
    HttpError::Status {
        status: 500,
        body: format!("{} unavailable", what),
    }
}

// ============================================================================
// Source registry
// ============================================================================

#[derive(Default)]
pub struct FakeSource {
    artists: Vec<SourceArtist>,
}

impl FakeSource {
    pub fn new(names: &[&str]) -> Self {
        Self {
            artists: names
                .iter()
                .enumerate()
                .map(|(i, name)| SourceArtist {
                    id: format!("ar-{}", i + 1),
                    name: name.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl SourceRegistry for FakeSource {
    async fn list_artists(&self, _cancel: &CancellationToken) -> Result<Vec<SourceArtist>, HttpError> {
        Ok(self.artists.clone())
    }
}

// ============================================================================
// Naming registry
// ============================================================================

#[derive(Default)]
pub struct FakeNaming {
    mbids: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FakeNaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artist(mut self, name: &str, mbid: &str) -> Self {
        self.mbids.insert(normalize_name(name), mbid.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NamingRegistry for FakeNaming {
    async fn search_artists(
        &self,
        name: &str,
        _limit: u32,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ArtistMatch>, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .mbids
            .get(&normalize_name(name))
            .map(|mbid| ArtistMatch {
                mbid: mbid.clone(),
                name: name.to_string(),
                score: Some(100),
            })
            .into_iter()
            .collect())
    }
}

// ============================================================================
// Detail registry
// ============================================================================

#[derive(Default)]
pub struct FakeDetails {
    albums: HashMap<String, Vec<ReleaseGroup>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<(String, u32)>>,
}

impl FakeDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// `albums` are `(release group id, title, first release date)`
    pub fn with_albums(mut self, artist: &str, albums: &[(&str, &str, &str)]) -> Self {
        let groups = albums
            .iter()
            .map(|(id, title, date)| ReleaseGroup {
                id: id.to_string(),
                title: title.to_string(),
                primary_type: Some("Album".to_string()),
                first_release_date: Some(date.to_string()),
            })
            .collect();
        self.albums.insert(artist.to_string(), groups);
        self
    }

    pub fn failing_for(mut self, artist: &str) -> Self {
        self.failing.insert(artist.to_string());
        self
    }

    /// `(artist, limit)` of every search, in call order
    pub fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DetailRegistry for FakeDetails {
    async fn search_release_groups(
        &self,
        artist: &str,
        _primary_type: &str,
        limit: u32,
        _cancel: &CancellationToken,
    ) -> Result<Vec<ReleaseGroup>, HttpError> {
        self.requests
            .lock()
            .unwrap()
            .push((artist.to_string(), limit));

        if self.failing.contains(artist) {
            return Err(api_error("release-group search"));
        }

        let mut groups = self.albums.get(artist).cloned().unwrap_or_default();
        groups.truncate(limit as usize);
        Ok(groups)
    }
}

// ============================================================================
// Similarity provider
// ============================================================================

pub struct FakeProvider {
    name: &'static str,
    configured: bool,
    results: HashMap<String, Vec<(String, f64)>>,
    calls: Mutex<Vec<String>>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl FakeProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            configured: true,
            results: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            cancel_on_call: None,
        }
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Candidates returned when asked about library artist `artist`
    pub fn with_similar(mut self, artist: &str, similar: &[(&str, f64)]) -> Self {
        self.results.insert(
            normalize_name(artist),
            similar
                .iter()
                .map(|(name, score)| (name.to_string(), *score))
                .collect(),
        );
        self
    }

    /// Fire `token` while serving the `call`-th request (1-based)
    pub fn cancel_on_call(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Library artists asked about, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SimilarityProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn get_similar_artists(
        &self,
        name: &str,
        _mbid: Option<&str>,
        limit: u32,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CandidateResult>, ProviderError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(name.to_string());
            calls.len()
        };

        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
                return Err(ProviderError::Cancelled);
            }
        }

        Ok(self
            .results
            .get(&normalize_name(name))
            .map(|similar| {
                similar
                    .iter()
                    .take(limit as usize)
                    .map(|(candidate, score)| {
                        CandidateResult::new(candidate.clone(), *score, None, self.name)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ============================================================================
// Cover art and job control
// ============================================================================

pub struct FakeCoverArt;

impl CoverArt for FakeCoverArt {
    fn cover_url(&self, release_group_mbid: &str) -> Option<String> {
        Some(format!("cover://{}", release_group_mbid))
    }
}

#[derive(Default)]
pub struct FakeJobs {
    running: HashSet<String>,
}

impl FakeJobs {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(job_name: &str) -> Self {
        Self {
            running: HashSet::from([job_name.to_string()]),
        }
    }
}

#[async_trait::async_trait]
impl JobControl for FakeJobs {
    async fn is_running(&self, job_name: &str) -> bool {
        self.running.contains(job_name)
    }
}

// ============================================================================
// Recommendation feed and recording resolver
// ============================================================================

#[derive(Default)]
pub struct FakeFeed {
    collaborative: Vec<Recommendation>,
    weekly: Vec<Recommendation>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collaborative(mut self, items: &[(&str, f64)]) -> Self {
        self.collaborative = items
            .iter()
            .map(|(mbid, score)| Recommendation {
                recording_mbid: mbid.to_string(),
                score: Some(*score),
            })
            .collect();
        self
    }

    pub fn with_weekly(mut self, mbids: &[&str]) -> Self {
        self.weekly = mbids
            .iter()
            .map(|mbid| Recommendation {
                recording_mbid: mbid.to_string(),
                score: None,
            })
            .collect();
        self
    }

    /// Which feed endpoints were used, in call order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RecommendationFeed for FakeFeed {
    async fn collaborative(
        &self,
        _username: &str,
        _token: &str,
        count: u32,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError> {
        self.calls.lock().unwrap().push("collaborative");
        Ok(self
            .collaborative
            .iter()
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn weekly_playlist(
        &self,
        _username: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Recommendation>, HttpError> {
        self.calls.lock().unwrap().push("weekly");
        Ok(self.weekly.clone())
    }
}

#[derive(Default)]
pub struct FakeResolver {
    tracks: HashMap<String, RecordingInfo>,
    albums: HashMap<String, AlbumInfo>,
    failing: HashSet<String>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, recording: &str, artist: &str, title: &str, release_group: &str) -> Self {
        self.tracks.insert(
            recording.to_string(),
            RecordingInfo {
                artist: artist.to_string(),
                title: title.to_string(),
                mbid: recording.to_string(),
                release_group_mbid: Some(release_group.to_string()),
            },
        );
        self
    }

    pub fn with_album(
        mut self,
        recording: &str,
        artist: &str,
        album: &str,
        album_mbid: &str,
        year: i32,
    ) -> Self {
        self.albums.insert(
            recording.to_string(),
            AlbumInfo {
                artist: artist.to_string(),
                title: album.to_string(),
                mbid: album_mbid.to_string(),
                recording_mbid: recording.to_string(),
                track_title: format!("{} (track)", album),
                year: Some(year),
            },
        );
        self
    }

    pub fn failing_for(mut self, recording: &str) -> Self {
        self.failing.insert(recording.to_string());
        self
    }
}

#[async_trait::async_trait]
impl RecordingResolver for FakeResolver {
    async fn resolve_recording(
        &self,
        mbid: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<RecordingInfo>, HttpError> {
        if self.failing.contains(mbid) {
            return Err(api_error("recording lookup"));
        }
        Ok(self.tracks.get(mbid).cloned())
    }

    async fn resolve_recording_to_album(
        &self,
        mbid: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<AlbumInfo>, HttpError> {
        if self.failing.contains(mbid) {
            return Err(api_error("recording lookup"));
        }
        Ok(self.albums.get(mbid).cloned())
    }
}
