//! Classifier backends
//!
//! The registry owns every configured [`Classifier`] in configuration order.
//! The first entry is the primary backend: it serves the single-backend
//! paths and wins arbitration ties.

pub mod remote;

use crate::config::BackendConfig;
use crate::types::{Classifier, ClassifierError};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use remote::RemoteClassifier;

/// Ordered set of classifier backends
pub struct ClassifierRegistry {
    backends: Vec<Arc<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn new(backends: Vec<Arc<dyn Classifier>>) -> Self {
        Self { backends }
    }

    /// Build HTTP backends for every `[[backends]]` entry
    pub fn from_config(
        configs: &[BackendConfig],
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let backends = configs
            .iter()
            .map(|c| {
                let backend = RemoteClassifier::new(c.clone(), timeout)?;
                Ok(Arc::new(backend) as Arc<dyn Classifier>)
            })
            .collect::<Result<Vec<_>, ClassifierError>>()?;
        Ok(Self::new(backends))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn primary(&self) -> Option<&Arc<dyn Classifier>> {
        self.backends.first()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Classifier>> {
        self.backends.iter().find(|b| b.id() == id)
    }

    /// All backends in configuration order
    pub fn all(&self) -> &[Arc<dyn Classifier>] {
        &self.backends
    }

    /// Load every backend once, concurrently
    ///
    /// A backend that fails to load stays registered and reports
    /// `loaded = false`; requests to it fail with `BackendUnavailable`
    /// until a later load succeeds. Returns the number of loaded backends.
    pub async fn initialize_all(&self) -> usize {
        let loads = self.backends.iter().map(|backend| async move {
            match backend.load().await {
                Ok(()) => {
                    info!(backend = backend.id(), "Classifier backend loaded");
                    true
                }
                Err(e) => {
                    warn!(backend = backend.id(), error = %e, "Classifier backend failed to load");
                    false
                }
            }
        });

        let loaded = join_all(loads).await.into_iter().filter(|ok| *ok).count();
        info!(loaded, total = self.backends.len(), "Classifier backends initialized");
        loaded
    }

    /// `{backend id → loaded}`
    pub fn health(&self) -> BTreeMap<String, bool> {
        self.backends
            .iter()
            .map(|b| (b.id().to_string(), b.is_loaded()))
            .collect()
    }
}
