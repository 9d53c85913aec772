//! Parallel fetch across similarity providers

use super::models::CandidateResult;
use crate::providers::SimilarityProvider;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ask every provider for artists similar to one library artist
///
/// Each provider runs concurrently under its own child token and deadline.
/// A provider that times out or fails contributes nothing; the others are
/// unaffected. All calls settle before this returns, and results are
/// concatenated in provider order (duplicates across providers are kept).
///
/// Never fails: callers check `cancel` afterwards to tell a job-level
/// cancellation apart from an empty fetch.
pub async fn fetch_from_all(
    providers: &[Arc<dyn SimilarityProvider>],
    artist_name: &str,
    artist_mbid: Option<&str>,
    limit: u32,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<CandidateResult> {
    let calls = providers.iter().map(|provider| {
        let scope = cancel.child_token();
        async move {
            let call = provider.get_similar_artists(artist_name, artist_mbid, limit, &scope);

            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(results)) => results,
                Ok(Err(err)) => {
                    tracing::debug!(
                        provider = provider.name(),
                        artist = %artist_name,
                        error = %err,
                        "Provider returned no results"
                    );
                    Vec::new()
                }
                Err(_) => {
                    scope.cancel();
                    tracing::debug!(
                        provider = provider.name(),
                        artist = %artist_name,
                        timeout_ms = timeout.as_millis() as u64,
                        "Provider timed out"
                    );
                    Vec::new()
                }
            }
        }
    });

    join_all(calls).await.into_iter().flatten().collect()
}
