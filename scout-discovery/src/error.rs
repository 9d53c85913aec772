//! Error and outcome types for the discovery jobs

use crate::http::HttpError;
use thiserror::Error;

/// Failure of a discovery or recommendation run
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Job token fired; surfaced by `run` as [`JobOutcome::Cancelled`]
    #[error("Job cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(HttpError),

    #[error("Common error: {0}")]
    Common(#[from] scout_common::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<HttpError> for DiscoveryError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => DiscoveryError::Cancelled,
            other => DiscoveryError::Http(other),
        }
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// How a job run ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<R> {
    Completed(R),
    /// Preconditions not met (disabled, unconfigured)
    Skipped(String),
    /// A sibling job holds a shared rate-limited dependency
    Deferred(String),
    Cancelled,
}

impl<R> JobOutcome<R> {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&R> {
        match self {
            JobOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Bail out with [`DiscoveryError::Cancelled`] once the token has fired
pub(crate) fn ensure_not_cancelled(
    cancel: &tokio_util::sync::CancellationToken,
) -> DiscoveryResult<()> {
    if cancel.is_cancelled() {
        Err(DiscoveryError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TransportErrorKind;

    #[test]
    fn test_http_cancel_maps_to_cancelled() {
        assert!(matches!(
            DiscoveryError::from(HttpError::Cancelled),
            DiscoveryError::Cancelled
        ));

        let err = DiscoveryError::from(HttpError::Transport {
            kind: TransportErrorKind::ConnectionReset,
            message: "reset".into(),
        });
        assert!(matches!(err, DiscoveryError::Http(_)));
    }

    #[test]
    fn test_outcome_report() {
        let done: JobOutcome<u32> = JobOutcome::Completed(3);
        assert!(done.is_completed());
        assert_eq!(done.report(), Some(&3));

        let skipped: JobOutcome<u32> = JobOutcome::Skipped("disabled".into());
        assert!(!skipped.is_completed());
        assert_eq!(skipped.report(), None);
    }
}
