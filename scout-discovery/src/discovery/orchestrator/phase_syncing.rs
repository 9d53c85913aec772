//! SYNCING_SOURCES and RESOLVING_EXTERNAL_IDS
//!
//! Mirror the library into `catalog_artists`, then look up MusicBrainz IDs
//! for artists that do not have one yet.

use super::CatalogDiscoveryJob;
use crate::discovery::models::CatalogArtist;
use crate::error::{ensure_not_cancelled, DiscoveryError, DiscoveryResult};
use crate::types::SourceRegistry;
use chrono::Utc;
use scout_common::normalize_name;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

impl CatalogDiscoveryJob {
    /// Upsert every library artist and return the ones currently in the library
    pub(super) async fn phase_syncing(
        &self,
        source: &dyn SourceRegistry,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<Vec<CatalogArtist>> {
        ensure_not_cancelled(cancel)?;
        let artists = source.list_artists(cancel).await?;

        let synced_at = Utc::now();
        let mut current = HashSet::with_capacity(artists.len());
        for artist in &artists {
            self.collaborators
                .store
                .upsert_catalog_artist(&artist.id, &artist.name, synced_at)
                .await?;
            current.insert(normalize_name(&artist.name));
        }

        let library: Vec<CatalogArtist> = self
            .collaborators
            .store
            .catalog_artists()
            .await?
            .into_iter()
            .filter(|artist| current.contains(&artist.name_lower))
            .collect();

        tracing::info!(artists = library.len(), "Library synced");
        Ok(library)
    }

    /// Resolve missing MBIDs one artist at a time
    ///
    /// A lookup that fails or finds nothing leaves the artist unresolved;
    /// only cancellation aborts the phase.
    pub(super) async fn phase_resolving(
        &self,
        mut library: Vec<CatalogArtist>,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<(Vec<CatalogArtist>, usize)> {
        let mut resolved = 0;

        for artist in library.iter_mut().filter(|a| a.mbid.is_none()) {
            ensure_not_cancelled(cancel)?;

            let matches = match self
                .collaborators
                .naming
                .search_artists(&artist.name, 1, cancel)
                .await
            {
                Ok(matches) => matches,
                Err(err) if err.is_cancelled() => return Err(DiscoveryError::Cancelled),
                Err(err) => {
                    tracing::warn!(artist = %artist.name, error = %err, "MBID lookup failed");
                    continue;
                }
            };

            let Some(first) = matches.into_iter().next() else {
                tracing::debug!(artist = %artist.name, "No MBID match");
                continue;
            };

            self.collaborators
                .store
                .set_artist_mbid(artist.id, &first.mbid)
                .await?;
            tracing::debug!(artist = %artist.name, mbid = %first.mbid, "MBID resolved");
            artist.mbid = Some(first.mbid);
            resolved += 1;
        }

        if resolved > 0 {
            tracing::info!(resolved, "Resolved artist MBIDs");
        }
        Ok((library, resolved))
    }
}
