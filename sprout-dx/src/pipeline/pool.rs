//! Bounded worker pool
//!
//! Process-wide pool shared by every request. Each submitted job runs as its
//! own tokio task once it holds one of `size` semaphore permits, so at most
//! `size` backend/generator calls execute at a time regardless of how many
//! requests are in flight. Request handlers only await the job's handle.
//!
//! The timeout covers execution, not time spent waiting for a permit; a
//! timed-out job is dropped (cancelled) at its next await point.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Worker pool error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Job '{job}' timed out after {timeout_ms} ms")]
    TimedOut { job: String, timeout_ms: u64 },

    #[error("Job '{job}' panicked: {message}")]
    Panicked { job: String, message: String },

    #[error("Job '{job}' was cancelled")]
    Cancelled { job: String },

    #[error("Worker pool is shut down")]
    Closed,
}

/// Semaphore-bounded job executor
#[derive(Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create pool with `size` workers (minimum 1)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not currently running a job
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the pool and wait for its output
    pub async fn run<F, T>(&self, job: &str, timeout: Duration, fut: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let job_name = job.to_string();
        let timeout_ms = timeout.as_millis() as u64;

        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;
            debug!(job = %job_name, "Worker acquired");
            tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| PoolError::TimedOut {
                    job: job_name,
                    timeout_ms,
                })
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                warn!(job = job, message = %message, "Worker job panicked");
                Err(PoolError::Panicked {
                    job: job.to_string(),
                    message,
                })
            }
            Err(_) => Err(PoolError::Cancelled {
                job: job.to_string(),
            }),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
