//! Similarity providers over local mock upstreams

mod helpers;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use helpers::{spawn_server, FakeNaming};
use scout_discovery::clients::{LastFmClient, ListenBrainzClient};
use scout_discovery::http::RetryPolicy;
use scout_discovery::providers::{
    LastFmProvider, ListenBrainzProvider, ProviderError, SimilarityProvider,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const UA: &str = "ScoutTest/0.1 ( test@example.org )";

/// Labs server answering every similar-artists query with Muse and Bjork
async fn labs_server(hits: Arc<AtomicUsize>) -> String {
    let router = Router::new()
        .route(
            "/similar-artists/json",
            post(
                |State(hits): State<Arc<AtomicUsize>>, Json(body): Json<Value>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(body[0]["artist_mbids"], json!(["mbid-radiohead"]));
                    Json(json!([{
                        "similar_artists": [
                            {"artist_mbid": "mbid-muse", "name": "Muse", "score": 0.9},
                            {"artist_mbid": "mbid-bjork", "name": "Bjork", "score": 0.6}
                        ]
                    }]))
                },
            ),
        )
        .with_state(hits);
    spawn_server(router).await
}

#[tokio::test]
async fn test_listenbrainz_resolves_mbid_once_per_artist() {
    // Given: a provider whose naming registry knows Radiohead
    let hits = Arc::new(AtomicUsize::new(0));
    let base = labs_server(hits.clone()).await;
    let naming = Arc::new(FakeNaming::new().with_artist("Radiohead", "mbid-radiohead"));
    let provider = ListenBrainzProvider::new(
        ListenBrainzClient::with_base_urls(UA, &base, &base).unwrap(),
        naming.clone(),
    );
    let cancel = CancellationToken::new();

    // When: asked twice, under two spellings
    let first = provider
        .get_similar_artists("Radiohead", None, 10, &cancel)
        .await
        .unwrap();
    let second = provider
        .get_similar_artists("RADIOHEAD", None, 10, &cancel)
        .await
        .unwrap();

    // Then: one name lookup, two similarity queries
    assert_eq!(naming.calls(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(first, second);

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].name, "Muse");
    assert_eq!(first[0].mbid.as_deref(), Some("mbid-muse"));
    assert_eq!(first[0].provider, "listenbrainz");
}

#[tokio::test]
async fn test_listenbrainz_known_mbid_skips_lookup() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = labs_server(hits.clone()).await;
    let naming = Arc::new(FakeNaming::new());
    let provider = ListenBrainzProvider::new(
        ListenBrainzClient::with_base_urls(UA, &base, &base).unwrap(),
        naming.clone(),
    );

    let results = provider
        .get_similar_artists("Radiohead", Some("mbid-radiohead"), 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(naming.calls(), 0);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_listenbrainz_unknown_artist_is_empty() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = labs_server(hits.clone()).await;
    let provider = ListenBrainzProvider::new(
        ListenBrainzClient::with_base_urls(UA, &base, &base).unwrap(),
        Arc::new(FakeNaming::new()),
    );

    let results = provider
        .get_similar_artists("Nobody", None, 10, &CancellationToken::new())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_listenbrainz_upstream_failure_is_absorbed() {
    let router = Router::new().route(
        "/similar-artists/json",
        post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = spawn_server(router).await;
    let provider = ListenBrainzProvider::new(
        ListenBrainzClient::with_base_urls(UA, &base, &base).unwrap(),
        Arc::new(FakeNaming::new()),
    );

    let results = provider
        .get_similar_artists("Radiohead", Some("mbid-radiohead"), 10, &CancellationToken::new())
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_lastfm_provider_maps_results() {
    let router = Router::new().route(
        "/2.0/",
        get(|| async {
            Json(json!({"similarartists": {"artist": [
                {"name": "Muse", "match": "0.9", "mbid": "mbid-muse"},
                {"name": "Thom Yorke", "match": "0.5", "mbid": ""}
            ]}}))
        }),
    );
    let base = spawn_server(router).await;
    let provider = LastFmProvider::new(
        LastFmClient::with_base_url(UA, "key-123", &format!("{}/2.0/", base)).unwrap(),
    );

    assert!(provider.is_configured());
    let results = provider
        .get_similar_artists("Radiohead", None, 10, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].provider, "lastfm");
    assert_eq!(results[1].name_lower, "thom yorke");
    assert_eq!(results[1].mbid, None);
}

#[tokio::test]
async fn test_lastfm_gives_up_after_retry_ceiling() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/2.0/",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }),
        )
        .with_state(hits.clone());
    let base = spawn_server(router).await;
    let provider = LastFmProvider::new(
        LastFmClient::with_base_url(UA, "key-123", &format!("{}/2.0/", base))
            .unwrap()
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(5))),
    );

    let results = provider
        .get_similar_artists("Radiohead", None, 10, &CancellationToken::new())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_lastfm_without_key_is_unconfigured() {
    let provider = LastFmProvider::new(LastFmClient::new(UA, "  ").unwrap());
    assert!(!provider.is_configured());
}

#[tokio::test]
async fn test_cancelled_provider_call_surfaces() {
    let provider = ListenBrainzProvider::new(
        ListenBrainzClient::with_base_urls(UA, "http://127.0.0.1:9", "http://127.0.0.1:9").unwrap(),
        Arc::new(FakeNaming::new()),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = provider
        .get_similar_artists("Radiohead", Some("mbid-radiohead"), 10, &cancel)
        .await;

    assert!(matches!(result, Err(ProviderError::Cancelled)));
}
