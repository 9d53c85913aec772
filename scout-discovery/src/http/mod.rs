//! Outbound HTTP plumbing shared by every external client
//!
//! - [`HttpError`]: one failure type for all clients, carrying enough
//!   classification for the retry policy to decide what is transient
//! - [`retry::RetryPolicy`]: exponential backoff around a single network call
//! - [`rate_limit::RateLimiter`]: minimum spacing between calls to one registry

pub mod rate_limit;
pub mod retry;

pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Statuses that signal the remote side is shedding load
pub const RETRYABLE_STATUS_CODES: [u16; 2] = [429, 503];

/// Default request timeout for external APIs
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Low-level connection failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionReset,
    ConnectionRefused,
    TimedOut,
    DnsNotFound,
    AddrInUse,
    HostUnreachable,
    DnsTryAgain,
    BrokenPipe,
    Tls,
    Other,
}

impl TransportErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, TransportErrorKind::Other)
    }
}

/// Failure of one outbound HTTP call
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Transport error ({kind:?}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    /// Well-formed response reporting a failure in its payload
    #[error("API error: {0}")]
    Api(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl HttpError {
    /// Whether the retry policy may attempt the call again
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Transport { kind, .. } => kind.is_transient(),
            HttpError::Status { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            HttpError::Decode(_) | HttpError::Api(_) | HttpError::Cancelled => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, HttpError::Cancelled)
    }

    /// HTTP status of a non-success response, if that is what failed
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return HttpError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            };
        }

        if err.is_decode() {
            return HttpError::Decode(err.to_string());
        }

        HttpError::Transport {
            kind: classify_transport(&err),
            message: err.to_string(),
        }
    }
}

/// Map a reqwest transport failure onto a [`TransportErrorKind`]
///
/// reqwest does not expose errno codes directly, so the source chain is
/// walked for an `io::Error` first and the rendered messages second.
fn classify_transport(err: &reqwest::Error) -> TransportErrorKind {
    let mut messages = Vec::new();
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);

    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<std::io::Error>() {
            if let Some(kind) = classify_io_kind(io_err.kind()) {
                return kind;
            }
        }
        messages.push(current.to_string().to_lowercase());
        source = current.source();
    }

    let text = messages.join(": ");
    if let Some(kind) = classify_message(&text) {
        return kind;
    }

    if err.is_timeout() {
        TransportErrorKind::TimedOut
    } else if err.is_connect() {
        TransportErrorKind::ConnectionRefused
    } else {
        TransportErrorKind::Other
    }
}

fn classify_io_kind(kind: std::io::ErrorKind) -> Option<TransportErrorKind> {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            Some(TransportErrorKind::ConnectionReset)
        }
        ErrorKind::ConnectionRefused => Some(TransportErrorKind::ConnectionRefused),
        ErrorKind::TimedOut => Some(TransportErrorKind::TimedOut),
        ErrorKind::AddrInUse => Some(TransportErrorKind::AddrInUse),
        ErrorKind::BrokenPipe => Some(TransportErrorKind::BrokenPipe),
        _ => None,
    }
}

fn classify_message(text: &str) -> Option<TransportErrorKind> {
    if text.contains("temporary failure in name resolution") || text.contains("try again") {
        Some(TransportErrorKind::DnsTryAgain)
    } else if text.contains("dns error") || text.contains("failed to lookup address") {
        Some(TransportErrorKind::DnsNotFound)
    } else if text.contains("no route to host") || text.contains("host unreachable") {
        Some(TransportErrorKind::HostUnreachable)
    } else if text.contains("connection reset") {
        Some(TransportErrorKind::ConnectionReset)
    } else if text.contains("connection refused") {
        Some(TransportErrorKind::ConnectionRefused)
    } else if text.contains("broken pipe") {
        Some(TransportErrorKind::BrokenPipe)
    } else if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
        Some(TransportErrorKind::Tls)
    } else {
        None
    }
}

/// Build the reqwest client used by every external API client
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, HttpError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(HttpError::from)
}

/// Turn a non-success response into [`HttpError::Status`]
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Send a request and decode its JSON body
pub async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, HttpError> {
    let response = check_status(request.send().await?).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| HttpError::Decode(e.to_string()))
}

/// Sleep unless the token fires first
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), HttpError> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(HttpError::Cancelled)
        } else {
            Ok(())
        };
    }

    tokio::select! {
        _ = cancel.cancelled() => Err(HttpError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(kind: TransportErrorKind) -> HttpError {
        HttpError::Transport {
            kind,
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_transient_transport_kinds() {
        for kind in [
            TransportErrorKind::ConnectionReset,
            TransportErrorKind::ConnectionRefused,
            TransportErrorKind::TimedOut,
            TransportErrorKind::DnsNotFound,
            TransportErrorKind::AddrInUse,
            TransportErrorKind::HostUnreachable,
            TransportErrorKind::DnsTryAgain,
            TransportErrorKind::BrokenPipe,
            TransportErrorKind::Tls,
        ] {
            assert!(transport(kind).is_transient(), "{:?} should retry", kind);
        }
        assert!(!transport(TransportErrorKind::Other).is_transient());
    }

    #[test]
    fn test_retryable_statuses() {
        let status = |status| HttpError::Status {
            status,
            body: String::new(),
        };

        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(500).is_transient());
        assert!(!status(502).is_transient());
    }

    #[test]
    fn test_cancel_and_decode_never_retry() {
        assert!(!HttpError::Cancelled.is_transient());
        assert!(!HttpError::Decode("bad json".into()).is_transient());
        assert!(HttpError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_classify_message() {
        assert_eq!(
            classify_message("error trying to connect: dns error: failed to lookup address"),
            Some(TransportErrorKind::DnsNotFound)
        );
        assert_eq!(
            classify_message("temporary failure in name resolution"),
            Some(TransportErrorKind::DnsTryAgain)
        );
        assert_eq!(
            classify_message("invalid peer certificate: unknownissuer"),
            Some(TransportErrorKind::Tls)
        );
        assert_eq!(classify_message("builder error"), None);
    }

    #[tokio::test]
    async fn test_sleep_or_cancel_aborts() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = sleep_or_cancel(Duration::from_secs(60), &cancel).await;
        assert!(matches!(result, Err(HttpError::Cancelled)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        let err = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();

        let err = HttpError::from(err);
        assert!(err.is_transient(), "expected transient, got {:?}", err);
    }
}
