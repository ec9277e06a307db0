//! Model arbitration
//!
//! Runs every configured classifier over the same image and picks one
//! winner. All backends start together and the arbitrator waits for every
//! one of them: a slow backend with a higher score must still be able to
//! win, so nothing is cancelled early.
//!
//! # Selection rule
//! - Highest `max_confidence` wins, compared strictly (`>`).
//! - Ties go to the backend listed first in configuration (the primary).
//! - A failed backend contributes no candidate and can never win.
//! - If every backend fails, arbitration fails with
//!   [`ArbitrationError::AllBackendsUnavailable`].
//!
//! Completion order never matters: results are collected back into
//! configuration order before selection, so identical scores always produce
//! the same winner.

use crate::backends::ClassifierRegistry;
use crate::pipeline::pool::{PoolError, WorkerPool};
use crate::pipeline::tiering::ConfidenceTierClassifier;
use crate::types::{
    ArbitrationCandidate, ArbitrationResult, BackendFailure, ClassificationResult, Classifier,
    ClassifierError, ImageBytes,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Arbitration error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArbitrationError {
    #[error("No classifier backends configured")]
    NoBackends,

    #[error("All classifier backends unavailable: {}", summarize(.failures))]
    AllBackendsUnavailable { failures: Vec<BackendFailure> },
}

fn summarize(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.backend_id, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Concurrent multi-backend classifier
pub struct ModelArbitrator {
    registry: Arc<ClassifierRegistry>,
    pool: Arc<WorkerPool>,
    tiers: ConfidenceTierClassifier,
    backend_timeout: Duration,
}

impl ModelArbitrator {
    pub fn new(
        registry: Arc<ClassifierRegistry>,
        pool: Arc<WorkerPool>,
        tiers: ConfidenceTierClassifier,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            pool,
            tiers,
            backend_timeout,
        }
    }

    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    /// Classify with a single backend
    ///
    /// Detections below `min_confidence` are dropped before tiering.
    pub async fn classify_with(
        &self,
        backend: &Arc<dyn Classifier>,
        image: ImageBytes,
        min_confidence: f64,
    ) -> Result<ClassificationResult, ClassifierError> {
        let backend_id = backend.id().to_string();
        let job = Arc::clone(backend);
        let started = std::time::Instant::now();

        let outcome = self
            .pool
            .run(&format!("classify:{}", backend_id), self.backend_timeout, async move {
                job.classify(&image).await
            })
            .await;

        let detections = match outcome {
            Ok(result) => result?,
            Err(PoolError::TimedOut { timeout_ms, .. }) => {
                return Err(ClassifierError::unavailable(
                    &backend_id,
                    format!("no response within {} ms", timeout_ms),
                ))
            }
            Err(e) => return Err(ClassifierError::inference(&backend_id, e.to_string())),
        };

        let kept: Vec<_> = detections
            .into_iter()
            .filter(|d| d.confidence >= min_confidence)
            .collect();
        let result = self.tiers.classify(kept);

        debug!(
            backend = %backend_id,
            detections = result.detections.len(),
            max_confidence = result.max_confidence,
            tier = ?result.tier,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Classification complete"
        );

        Ok(result)
    }

    /// Run all backends concurrently and select the winner
    pub async fn arbitrate(
        &self,
        image: ImageBytes,
        min_confidence: f64,
    ) -> Result<ArbitrationResult, ArbitrationError> {
        let backends = self.registry.all();
        if backends.is_empty() {
            return Err(ArbitrationError::NoBackends);
        }

        let runs = backends.iter().map(|backend| {
            let image = Arc::clone(&image);
            async move {
                let result = self.classify_with(backend, image, min_confidence).await;
                (backend, result)
            }
        });

        // join_all preserves input (configuration) order
        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        for (backend, result) in join_all(runs).await {
            match result {
                Ok(result) => candidates.push(ArbitrationCandidate {
                    backend_id: backend.id().to_string(),
                    display_name: backend.display_name().to_string(),
                    result,
                }),
                Err(e) => {
                    warn!(
                        backend = backend.id(),
                        error = %e,
                        "Backend failed during arbitration (excluded from selection)"
                    );
                    failures.push(BackendFailure {
                        backend_id: backend.id().to_string(),
                        display_name: backend.display_name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let Some(chosen_index) = select_winner(&candidates) else {
            return Err(ArbitrationError::AllBackendsUnavailable { failures });
        };

        info!(
            winner = %candidates[chosen_index].backend_id,
            max_confidence = candidates[chosen_index].result.max_confidence,
            candidates = candidates.len(),
            failed = failures.len(),
            "Arbitration complete"
        );

        Ok(ArbitrationResult::new(chosen_index, candidates, failures))
    }
}

/// Index of the winning candidate, `None` if there are none
///
/// Strict comparison means the earliest candidate keeps ties.
pub fn select_winner(candidates: &[ArbitrationCandidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        match best {
            None => best = Some(index),
            Some(current) => {
                if candidate.result.max_confidence > candidates[current].result.max_confidence {
                    best = Some(index);
                }
            }
        }
    }
    best
}
