//! Pending approval queue (`pending_queue`)

use chrono::Utc;
use scout_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_REJECTED: &str = "rejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Album,
    Track,
}

impl PendingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingKind::Album => "album",
            PendingKind::Track => "track",
        }
    }
}

/// Which job produced a pending entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSource {
    Catalog,
    ListenBrainz,
}

impl PendingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PendingSource::Catalog => "catalog",
            PendingSource::ListenBrainz => "listenbrainz",
        }
    }
}

/// Item to enqueue for approval
#[derive(Debug, Clone, PartialEq)]
pub struct NewPendingEntry {
    pub mbid: String,
    pub kind: PendingKind,
    pub artist: String,
    /// Album or track title
    pub title: String,
    /// Display score (percent)
    pub score: Option<f64>,
    pub source: PendingSource,
    /// Library artists that led to this suggestion
    pub similar_to: Vec<String>,
    /// Recording that led to an album suggestion
    pub source_track: Option<String>,
    pub cover_url: Option<String>,
    pub year: Option<i32>,
}

/// Whether an entry with this MBID exists in the given status
pub async fn has_status(pool: &SqlitePool, mbid: &str, status: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pending_queue WHERE mbid = ? AND status = ?")
            .bind(mbid)
            .bind(status)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Enqueue an item; an MBID that is already queued (in any status) is left as is
///
/// Returns `false` when the row already existed.
pub async fn add_pending(pool: &SqlitePool, entry: &NewPendingEntry) -> Result<bool> {
    let similar_to = serde_json::to_string(&entry.similar_to)?;

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO pending_queue (
            id, mbid, kind, artist, title, score, source, similar_to,
            source_track, cover_url, year, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&entry.mbid)
    .bind(entry.kind.as_str())
    .bind(&entry.artist)
    .bind(&entry.title)
    .bind(entry.score)
    .bind(entry.source.as_str())
    .bind(similar_to)
    .bind(&entry.source_track)
    .bind(&entry.cover_url)
    .bind(entry.year)
    .bind(STATUS_PENDING)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
