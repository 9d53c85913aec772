//! ListenBrainz recommendation job
//!
//! Pulls recording recommendations (weekly exploration playlist or
//! collaborative filtering), resolves them through MusicBrainz, and queues
//! tracks or their albums for review. Every handled MBID is recorded in
//! `processed_recordings` so later runs skip it.

use crate::clients::listenbrainz::Recommendation;
use crate::db::{NewPendingEntry, PendingKind, PendingQueue, PendingSource, ProcessedRecordings};
use crate::discovery::ranking::normalize_score_to_percent;
use crate::error::{ensure_not_cancelled, DiscoveryError, DiscoveryResult, JobOutcome};
use crate::types::{CoverArt, RecommendationFeed, RecordingResolver};
use scout_common::config::{
    ApprovalMode, FetchMode, ListenBrainzConfig, RecommendationSource, TomlConfig,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Source tag for `processed_recordings` and queued entries
const PROCESSED_SOURCE: PendingSource = PendingSource::ListenBrainz;

/// Settings the recommendation job reads from the TOML configuration
#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    pub listenbrainz: Option<ListenBrainzConfig>,
    pub mode: FetchMode,
    pub fetch_count: u32,
    /// Minimum score, as a fraction (0-1) or a percent
    pub min_score: Option<f64>,
}

impl RecommendationSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            listenbrainz: config.listenbrainz.clone(),
            mode: config.mode,
            fetch_count: config.fetch_count,
            min_score: config.min_score,
        }
    }

    fn min_score_percent(&self) -> Option<f64> {
        self.min_score
            .and_then(|min| normalize_score_to_percent(min, 1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationReport {
    pub recommendations: usize,
    pub below_min_score: usize,
    pub already_handled: usize,
    /// Items queued (or logged, in auto mode)
    pub added: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct RecommendationCollaborators {
    pub feed: Arc<dyn RecommendationFeed>,
    pub resolver: Arc<dyn RecordingResolver>,
    pub pending: Arc<dyn PendingQueue>,
    pub processed: Arc<dyn ProcessedRecordings>,
    pub cover_art: Arc<dyn CoverArt>,
}

/// What happened to one recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handled {
    Added,
    AlreadyHandled,
    Unresolved,
}

pub struct RecommendationJob {
    settings: RecommendationSettings,
    collaborators: RecommendationCollaborators,
}

impl RecommendationJob {
    pub fn new(settings: RecommendationSettings, collaborators: RecommendationCollaborators) -> Self {
        Self {
            settings,
            collaborators,
        }
    }

    pub async fn run(
        &self,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<JobOutcome<RecommendationReport>> {
        let Some(lb) = self
            .settings
            .listenbrainz
            .as_ref()
            .filter(|lb| !lb.username.trim().is_empty())
        else {
            tracing::info!("No ListenBrainz username configured; skipping recommendations");
            return Ok(JobOutcome::Skipped("no ListenBrainz username configured".into()));
        };

        match self.execute(lb, cancel).await {
            Ok(report) => {
                tracing::info!(
                    recommendations = report.recommendations,
                    added = report.added,
                    failed = report.failed,
                    "ListenBrainz fetch complete"
                );
                Ok(JobOutcome::Completed(report))
            }
            Err(DiscoveryError::Cancelled) => {
                tracing::info!("ListenBrainz fetch cancelled");
                Ok(JobOutcome::Cancelled)
            }
            Err(err) => {
                tracing::error!(error = %err, "ListenBrainz fetch failed");
                Err(err)
            }
        }
    }

    async fn fetch_recommendations(
        &self,
        lb: &ListenBrainzConfig,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<Vec<Recommendation>> {
        let feed = &self.collaborators.feed;
        let token = lb.token.as_deref().filter(|t| !t.trim().is_empty());

        let recommendations = match (lb.source_type, token) {
            (RecommendationSource::Collaborative, Some(token)) => {
                feed.collaborative(&lb.username, token, self.settings.fetch_count, cancel)
                    .await?
            }
            (RecommendationSource::Collaborative, None) => {
                tracing::warn!("Collaborative recommendations need a token; using weekly playlist");
                feed.weekly_playlist(&lb.username, cancel).await?
            }
            (RecommendationSource::WeeklyPlaylist, _) => {
                feed.weekly_playlist(&lb.username, cancel).await?
            }
        };

        Ok(recommendations)
    }

    async fn execute(
        &self,
        lb: &ListenBrainzConfig,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<RecommendationReport> {
        ensure_not_cancelled(cancel)?;
        let recommendations = self.fetch_recommendations(lb, cancel).await?;

        let mut report = RecommendationReport {
            recommendations: recommendations.len(),
            ..Default::default()
        };
        tracing::info!(
            username = %lb.username,
            count = recommendations.len(),
            mode = ?self.settings.mode,
            "Processing ListenBrainz recommendations"
        );

        let min_score = self.settings.min_score_percent();
        let mut seen_albums = HashSet::new();

        for recommendation in &recommendations {
            ensure_not_cancelled(cancel)?;

            let score = recommendation
                .score
                .and_then(|score| normalize_score_to_percent(score, 1));
            if let (Some(score), Some(min)) = (score, min_score) {
                if score < min {
                    tracing::debug!(mbid = %recommendation.recording_mbid, score, "Below minimum score");
                    report.below_min_score += 1;
                    continue;
                }
            }

            let handled = self
                .handle_recording(recommendation, score, lb.approval_mode, &mut seen_albums, cancel)
                .await;

            match handled {
                Ok(Handled::Added) => report.added += 1,
                Ok(Handled::AlreadyHandled) => report.already_handled += 1,
                Ok(Handled::Unresolved) => {}
                Err(DiscoveryError::Cancelled) => return Err(DiscoveryError::Cancelled),
                Err(err) => {
                    tracing::warn!(
                        mbid = %recommendation.recording_mbid,
                        error = %err,
                        "Skipping recommendation"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn handle_recording(
        &self,
        recommendation: &Recommendation,
        score: Option<f64>,
        approval: ApprovalMode,
        seen_albums: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<Handled> {
        let recording_mbid = recommendation.recording_mbid.as_str();
        if self
            .collaborators
            .processed
            .is_processed(recording_mbid, PROCESSED_SOURCE.as_str())
            .await?
        {
            return Ok(Handled::AlreadyHandled);
        }

        match self.settings.mode {
            FetchMode::Track => self.handle_track(recording_mbid, score, approval, cancel).await,
            FetchMode::Album => {
                self.handle_album(recording_mbid, score, approval, seen_albums, cancel)
                    .await
            }
        }
    }

    async fn handle_track(
        &self,
        recording_mbid: &str,
        score: Option<f64>,
        approval: ApprovalMode,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<Handled> {
        let Some(track) = self
            .collaborators
            .resolver
            .resolve_recording(recording_mbid, cancel)
            .await?
        else {
            tracing::debug!(mbid = %recording_mbid, "Recording not found");
            return Ok(Handled::Unresolved);
        };

        if self.collaborators.pending.is_pending(&track.mbid).await? {
            return Ok(Handled::AlreadyHandled);
        }

        let entry = NewPendingEntry {
            mbid: track.mbid.clone(),
            kind: PendingKind::Track,
            artist: track.artist.clone(),
            title: track.title.clone(),
            score,
            source: PROCESSED_SOURCE,
            similar_to: Vec::new(),
            source_track: None,
            cover_url: track
                .release_group_mbid
                .as_deref()
                .and_then(|rg| self.collaborators.cover_art.cover_url(rg)),
            year: None,
        };

        let handled = self.submit(&entry, approval).await?;
        self.collaborators
            .processed
            .mark_processed(recording_mbid, PROCESSED_SOURCE.as_str())
            .await?;
        Ok(handled)
    }

    async fn handle_album(
        &self,
        recording_mbid: &str,
        score: Option<f64>,
        approval: ApprovalMode,
        seen_albums: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<Handled> {
        let Some(album) = self
            .collaborators
            .resolver
            .resolve_recording_to_album(recording_mbid, cancel)
            .await?
        else {
            tracing::debug!(mbid = %recording_mbid, "Recording has no album");
            return Ok(Handled::Unresolved);
        };

        if !seen_albums.insert(album.mbid.clone()) {
            return Ok(Handled::AlreadyHandled);
        }

        let pending = &self.collaborators.pending;
        if self
            .collaborators
            .processed
            .is_processed(&album.mbid, PROCESSED_SOURCE.as_str())
            .await?
            || pending.is_rejected(&album.mbid).await?
            || pending.is_pending(&album.mbid).await?
        {
            return Ok(Handled::AlreadyHandled);
        }

        let entry = NewPendingEntry {
            mbid: album.mbid.clone(),
            kind: PendingKind::Album,
            artist: album.artist.clone(),
            title: album.title.clone(),
            score,
            source: PROCESSED_SOURCE,
            similar_to: Vec::new(),
            source_track: Some(album.track_title.clone()),
            cover_url: self.collaborators.cover_art.cover_url(&album.mbid),
            year: album.year,
        };

        let handled = self.submit(&entry, approval).await?;
        self.collaborators
            .processed
            .mark_processed(&album.mbid, PROCESSED_SOURCE.as_str())
            .await?;
        Ok(handled)
    }

    /// Queue `entry` in manual mode, log it in auto mode
    async fn submit(
        &self,
        entry: &NewPendingEntry,
        approval: ApprovalMode,
    ) -> DiscoveryResult<Handled> {
        match approval {
            ApprovalMode::Manual => {
                if !self.collaborators.pending.add_pending(entry).await? {
                    tracing::debug!(mbid = %entry.mbid, "Already queued");
                    return Ok(Handled::AlreadyHandled);
                }
                tracing::info!(
                    kind = entry.kind.as_str(),
                    artist = %entry.artist,
                    title = %entry.title,
                    score = ?entry.score,
                    "Queued for review"
                );
                Ok(Handled::Added)
            }
            ApprovalMode::Auto => {
                tracing::info!(
                    kind = entry.kind.as_str(),
                    artist = %entry.artist,
                    title = %entry.title,
                    "Auto approval not implemented; not queued"
                );
                Ok(Handled::Added)
            }
        }
    }
}
