//! Job registry: which jobs are running, and their cancellation tokens
//!
//! One registry is constructed by the caller and shared by every job it
//! launches. Starting a job hands back a [`JobGuard`]; dropping the guard
//! marks the job finished. The registry only sees its own process; jobs
//! started by separate processes are tracked in the `job_locks` table (see
//! [`crate::db::job_locks`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

pub const CATALOG_DISCOVERY_JOB: &str = "catalog-discovery";
pub const LISTENBRAINZ_FETCH_JOB: &str = "listenbrainz-fetch";

#[derive(Clone, Default)]
pub struct JobRegistry {
    running: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `job_name` as running; `None` if it already is
    pub fn start(&self, job_name: &str) -> Option<JobGuard> {
        let mut running = self.lock();
        if running.contains_key(job_name) {
            tracing::warn!(job = job_name, "Job already running");
            return None;
        }

        let token = CancellationToken::new();
        running.insert(job_name.to_string(), token.clone());
        tracing::debug!(job = job_name, "Job started");

        Some(JobGuard {
            registry: self.clone(),
            job_name: job_name.to_string(),
            token,
        })
    }

    /// Fire the token of a running job; false if it is not running
    pub fn cancel(&self, job_name: &str) -> bool {
        match self.lock().get(job_name) {
            Some(token) => {
                tracing::info!(job = job_name, "Cancelling job");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether `job_name` runs in this process
    pub fn is_running(&self, job_name: &str) -> bool {
        self.lock().contains_key(job_name)
    }

    pub fn is_cancelled(&self, job_name: &str) -> bool {
        self.lock()
            .get(job_name)
            .is_some_and(|token| token.is_cancelled())
    }

    /// Cancel every running job
    pub fn cancel_all(&self) {
        for (job_name, token) in self.lock().iter() {
            tracing::info!(job = %job_name, "Cancelling job");
            token.cancel();
        }
    }

    fn finish(&self, job_name: &str) {
        self.lock().remove(job_name);
        tracing::debug!(job = job_name, "Job finished");
    }
}

/// Running-job marker; the job is finished when this is dropped
pub struct JobGuard {
    registry: JobRegistry,
    job_name: String,
    token: CancellationToken,
}

impl JobGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.job_name);
    }
}
