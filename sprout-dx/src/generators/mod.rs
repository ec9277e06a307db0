//! Generator implementations
//!
//! - [`LlmTreatmentAdvisor`]: treatment advice for High tier diagnoses
//! - [`TemplateCareGuide`] / [`LlmCareGuide`]: plant care guides
//! - [`StagedGrowthPredictor`]: four-stage growth outlook
//! - [`OpenAiTextGenerator`]: chat-completions backend shared by the LLM generators

pub mod advisor;
pub mod care_guide;
pub mod growth;
pub mod text;

pub use advisor::LlmTreatmentAdvisor;
pub use care_guide::{LlmCareGuide, TemplateCareGuide};
pub use growth::StagedGrowthPredictor;
pub use text::OpenAiTextGenerator;

use crate::config::DxConfig;
use crate::pipeline::orchestrator::Generators;
use crate::types::{CareGuideGenerator, GeneratorError, TextGenerator};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the configured generator set
pub fn build_generators(config: &DxConfig) -> Result<Generators, GeneratorError> {
    let text: Arc<dyn TextGenerator> = Arc::new(OpenAiTextGenerator::new(
        config.llm.clone(),
        config.pool.generator_timeout(),
    )?);

    if text.is_available() {
        info!(model = %config.llm.model, "Text generator configured");
    } else {
        warn!("No LLM API key configured; treatment advice is disabled");
    }

    let care_guide: Arc<dyn CareGuideGenerator> = if config.care_guide.use_llm {
        Arc::new(LlmCareGuide::new(
            Arc::clone(&text),
            config.care_guide.fallback_to_template,
        ))
    } else {
        Arc::new(TemplateCareGuide)
    };

    Ok(Generators {
        advisor: Arc::new(LlmTreatmentAdvisor::new(
            Arc::clone(&text),
            config.llm.max_tokens,
        )),
        care_guide,
        growth: Arc::new(StagedGrowthPredictor),
    })
}
