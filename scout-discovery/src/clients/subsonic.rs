//! Subsonic-compatible library server (Navidrome, Gonic, ...)
//!
//! Only `getArtists` is needed: the library is the source registry for
//! catalog discovery.

use crate::http::{self, HttpError, RetryPolicy};
use crate::types::{SourceArtist, SourceRegistry};
use rand::Rng;
use scout_common::normalize_name;
use serde_json::Value;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

const API_VERSION: &str = "1.16.1";
const CLIENT_ID: &str = "scout";

pub struct SubsonicClient {
    http_client: reqwest::Client,
    host: String,
    username: String,
    password: String,
    retry: RetryPolicy,
}

impl SubsonicClient {
    pub fn new(user_agent: &str, host: &str, username: &str, password: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http_client: http::build_client(user_agent)?,
            host: host.trim().trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn make_salt() -> String {
        let bytes: [u8; 8] = rand::thread_rng().gen();
        bytes.iter().map(|value| format!("{value:02x}")).collect()
    }

    /// Salted token authentication parameters (`t = md5(password + salt)`)
    fn auth_params(&self) -> Vec<(&'static str, String)> {
        let salt = Self::make_salt();
        let token = format!("{:x}", md5::compute(format!("{}{}", self.password, salt)));
        vec![
            ("u", self.username.clone()),
            ("t", token),
            ("s", salt),
            ("f", "json".to_string()),
            ("v", API_VERSION.to_string()),
            ("c", CLIENT_ID.to_string()),
        ]
    }

    async fn request_json(&self, method: &str, cancel: &CancellationToken) -> Result<Value, HttpError> {
        let url = format!("{}/rest/{}.view", self.host, method);

        let parsed: Value = self
            .retry
            .execute("subsonic request", cancel, || async {
                let params = self.auth_params();
                http::send_json(self.http_client.get(&url).query(&params)).await
            })
            .await?;

        let response = parsed.get("subsonic-response");
        let status = response
            .and_then(|value| value.get("status"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        if status != "ok" {
            let message = response
                .and_then(|value| value.get("error"))
                .and_then(|value| value.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Subsonic server returned an error");
            return Err(HttpError::Api(format!("{}: {}", method, message)));
        }

        Ok(parsed)
    }
}

fn array_or_single(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

/// Flatten the `artists.index[].artist[]` tree, first occurrence per name wins
fn parse_artists(response: &Value) -> Vec<SourceArtist> {
    let indexes = response
        .get("subsonic-response")
        .and_then(|value| value.get("artists"))
        .and_then(|value| value.get("index"));

    let mut seen = HashSet::new();
    let mut artists = Vec::new();

    for index in array_or_single(indexes) {
        for artist in array_or_single(index.get("artist")) {
            let id = match artist.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => continue,
            };
            let Some(name) = artist.get("name").and_then(Value::as_str) else {
                continue;
            };

            if seen.insert(normalize_name(name)) {
                artists.push(SourceArtist {
                    id,
                    name: name.to_string(),
                });
            }
        }
    }

    artists
}

#[async_trait::async_trait]
impl SourceRegistry for SubsonicClient {
    async fn list_artists(&self, cancel: &CancellationToken) -> Result<Vec<SourceArtist>, HttpError> {
        let response = self.request_json("getArtists", cancel).await?;
        Ok(parse_artists(&response))
    }
}
