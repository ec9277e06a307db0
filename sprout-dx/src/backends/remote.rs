//! HTTP classifier backend
//!
//! Posts raw image bytes to an inference server and parses its detections:
//!
//! ```json
//! {"detections": [{"label": "Early blight", "full_label": "Tomato Early blight leaf",
//!                  "subject": "Tomato", "confidence": 0.91, "bbox": [x, y, w, h]}]}
//! ```
//!
//! Loading probes the server's health URL once. The probe is guarded by a
//! `OnceCell`, so concurrent first requests share a single load and a failed
//! load is retried by the next caller.

use crate::config::BackendConfig;
use crate::types::{BoundingBox, Classifier, ClassifierError, Detection};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("sprout-dx/", env!("CARGO_PKG_VERSION"));

/// Wire format of an inference response
#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    detections: Vec<RawDetection>,
}

#[derive(Debug, Deserialize)]
struct RawDetection {
    label: String,
    #[serde(default)]
    full_label: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    confidence: f64,
    #[serde(default)]
    bbox: Option<[f64; 4]>,
}

impl From<RawDetection> for Detection {
    fn from(raw: RawDetection) -> Self {
        let bbox = raw
            .bbox
            .map(|[x, y, w, h]| BoundingBox::new(x, y, w, h))
            .unwrap_or_default();
        let full_label = raw.full_label.unwrap_or_else(|| raw.label.clone());
        let subject = raw.subject.unwrap_or_default();
        Detection::new(raw.label, full_label, subject, raw.confidence, bbox)
    }
}

/// Classifier served over HTTP
pub struct RemoteClassifier {
    config: BackendConfig,
    http_client: reqwest::Client,
    loaded: OnceCell<()>,
}

impl RemoteClassifier {
    pub fn new(config: BackendConfig, timeout: Duration) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::unavailable(&config.id, e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            loaded: OnceCell::new(),
        })
    }

    async fn probe(&self) -> Result<(), ClassifierError> {
        let Some(url) = self.config.health_url.as_deref() else {
            return Ok(());
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ClassifierError::unavailable(&self.config.id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifierError::unavailable(
                &self.config.id,
                format!("health probe returned {}", response.status()),
            ));
        }

        info!(backend = %self.config.id, url, "Backend health probe succeeded");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Classifier for RemoteClassifier {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn display_name(&self) -> &str {
        &self.config.name
    }

    fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    async fn load(&self) -> Result<(), ClassifierError> {
        self.loaded.get_or_try_init(|| self.probe()).await?;
        Ok(())
    }

    async fn classify(&self, image: &[u8]) -> Result<Vec<Detection>, ClassifierError> {
        self.load().await?;

        debug!(backend = %self.config.id, bytes = image.len(), "Sending image for inference");

        let response = self
            .http_client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| ClassifierError::unavailable(&self.config.id, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&self.config.id, status, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClassifierError::inference(&self.config.id, e.to_string()))?;
        parse_detections(&self.config.id, &body)
    }
}

/// Map a non-success inference status onto the classifier error taxonomy
fn status_error(backend: &str, status: StatusCode, body: &str) -> ClassifierError {
    let reason = if body.trim().is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), body.trim())
    };

    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            ClassifierError::unavailable(backend, reason)
        }
        _ => ClassifierError::inference(backend, reason),
    }
}

fn parse_detections(backend: &str, body: &[u8]) -> Result<Vec<Detection>, ClassifierError> {
    let parsed: InferenceResponse = serde_json::from_slice(body)
        .map_err(|e| ClassifierError::inference(backend, format!("malformed response: {}", e)))?;
    Ok(parsed.detections.into_iter().map(Detection::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(health_url: Option<&str>) -> BackendConfig {
        BackendConfig {
            id: "vit".to_string(),
            name: "ViT".to_string(),
            url: "http://127.0.0.1:1/classify".to_string(),
            health_url: health_url.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_full_detection() {
        let body = br#"{"detections": [
            {"label": "Early blight", "full_label": "Tomato Early blight leaf",
             "subject": "Tomato", "confidence": 0.91, "bbox": [1, 2, 30, 40]}
        ]}"#;
        let detections = parse_detections("vit", body).unwrap();
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.label, "Early blight");
        assert_eq!(d.full_label, "Tomato Early blight leaf");
        assert_eq!(d.subject_name(), "Tomato");
        assert_eq!(d.confidence, 0.91);
        assert_eq!(d.bounding_box, BoundingBox::new(1.0, 2.0, 30.0, 40.0));
    }

    #[test]
    fn test_parse_minimal_detection() {
        let body = br#"{"detections": [{"label": "Rose", "confidence": 1.4}]}"#;
        let d = &parse_detections("vit", body).unwrap()[0];
        assert_eq!(d.full_label, "Rose");
        assert_eq!(d.subject_name(), "Rose");
        assert_eq!(d.confidence, 1.0, "out of range scores are clamped");
        assert_eq!(d.bounding_box, BoundingBox::default());
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_detections("vit", b"{}").unwrap().is_empty());
        let err = parse_detections("vit", b"not json").unwrap_err();
        assert!(matches!(err, ClassifierError::InferenceFailure { .. }));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("vit", StatusCode::SERVICE_UNAVAILABLE, "model loading"),
            ClassifierError::BackendUnavailable { .. }
        ));
        let err = status_error("vit", StatusCode::UNPROCESSABLE_ENTITY, "bad image");
        assert_eq!(
            err,
            ClassifierError::inference("vit", "HTTP 422: bad image")
        );
    }

    #[tokio::test]
    async fn test_load_without_health_url() {
        let backend = RemoteClassifier::new(config(None), Duration::from_secs(1)).unwrap();
        assert!(!backend.is_loaded());
        backend.load().await.unwrap();
        assert!(backend.is_loaded());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        // Port 1 is never listening
        let backend = RemoteClassifier::new(
            config(Some("http://127.0.0.1:1/health")),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = backend.classify(b"img").await.unwrap_err();
        assert!(matches!(err, ClassifierError::BackendUnavailable { .. }));
        assert!(!backend.is_loaded());
    }
}
