//! Treatment advisor backed by a text generator

use crate::types::{GeneratorError, TextGenerator, TextRequest, TreatmentAdvisor, TreatmentRequest};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a plant disease specialist. You give farmers and home \
gardeners practical, easy-to-follow treatment and prevention advice. Write in a friendly, \
professional tone and include concrete action steps.";

/// Builds a diagnosis prompt and asks the text generator for advice
pub struct LlmTreatmentAdvisor {
    text: Arc<dyn TextGenerator>,
    max_tokens: u32,
}

impl LlmTreatmentAdvisor {
    pub fn new(text: Arc<dyn TextGenerator>, max_tokens: u32) -> Self {
        Self { text, max_tokens }
    }

    /// Prompt for one diagnosis; notes are included only when non-blank
    pub fn build_prompt(request: &TreatmentRequest) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Plant diagnosis result:");
        let _ = writeln!(prompt, "- Plant species: {}", request.subject);
        let _ = writeln!(prompt, "- Disease/condition: {}", request.issue);
        let _ = writeln!(prompt, "- Model confidence: {:.1}%", request.confidence * 100.0);

        if let Some(notes) = request.user_notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let _ = writeln!(prompt, "\nAdditional notes from the grower:\n{}", notes);
        }

        prompt.push_str(
            "\nBased on this diagnosis, provide practical advice covering:\n\
             1. Overview: what the disease is and its main symptoms\n\
             2. Immediate actions to stop it spreading\n\
             3. Treatment: chemical, organic and physical options\n\
             4. Prevention: long-term care and environment management\n\
             5. Cautions: what to avoid while treating\n",
        );
        prompt
    }
}

#[async_trait::async_trait]
impl TreatmentAdvisor for LlmTreatmentAdvisor {
    fn is_available(&self) -> bool {
        self.text.is_available()
    }

    async fn advise(&self, request: &TreatmentRequest) -> Result<String, GeneratorError> {
        if !self.text.is_available() {
            return Err(GeneratorError::Unavailable(
                "treatment advisor has no text generator configured".to_string(),
            ));
        }

        let advice = self
            .text
            .generate(&TextRequest {
                system: SYSTEM_PROMPT.to_string(),
                prompt: Self::build_prompt(request),
                max_tokens: self.max_tokens,
            })
            .await?;

        info!(subject = %request.subject, issue = %request.issue, "Treatment advice generated");
        Ok(advice)
    }
}
