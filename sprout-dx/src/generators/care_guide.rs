//! Care guide generators
//!
//! [`TemplateCareGuide`] is deterministic and always succeeds.
//! [`LlmCareGuide`] asks the text generator for a JSON guide and recovers
//! from imperfect output in stages:
//! 1. Parse the first `{...}` block as JSON (missing fields use the template)
//! 2. Otherwise read `keyword: value` lines
//! 3. If generation itself fails, serve the template when fallback is enabled

use crate::types::{CareGuide, CareGuideGenerator, GeneratorError, TextGenerator, TextRequest};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a plant care expert specializing in indoor cultivation. \
Always respond with valid JSON only, no additional text.";

const GUIDE_MAX_TOKENS: u32 = 1000;

/// Built-in guide mentioning the plant by name
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCareGuide;

impl TemplateCareGuide {
    pub fn guide(plant_name: &str) -> CareGuide {
        CareGuide {
            watering: format!(
                "Water {} once or twice a week, thoroughly, when the soil surface is dry.",
                plant_name
            ),
            sunlight: format!(
                "{} prefers bright indirect light. Avoid direct midday sun.",
                plant_name
            ),
            temperature: "18-24°C indoors is ideal. Avoid sudden temperature changes.".to_string(),
            humidity: "Keep humidity moderate (40-60%). Mist the leaves in dry conditions."
                .to_string(),
            fertilizer: "Feed with liquid fertilizer 1-2 times a month in spring and summer, \
                         once a month in autumn and winter."
                .to_string(),
            soil: "Use a well-draining potting mix. Adding perlite or sand helps.".to_string(),
            tips: vec![
                "Avoid overwatering and use a pot with good drainage".to_string(),
                "Wipe dust off the leaves regularly to help photosynthesis".to_string(),
                "Keep the plant somewhere with good airflow to prevent pests".to_string(),
            ],
        }
    }
}

#[async_trait::async_trait]
impl CareGuideGenerator for TemplateCareGuide {
    async fn care_guide(&self, plant_name: &str) -> Result<CareGuide, GeneratorError> {
        Ok(Self::guide(plant_name))
    }
}

/// Guide fields as returned by the text generator; any may be missing
#[derive(Debug, Default, Deserialize)]
struct GuideFields {
    watering: Option<String>,
    sunlight: Option<String>,
    temperature: Option<String>,
    humidity: Option<String>,
    fertilizer: Option<String>,
    soil: Option<String>,
    tips: Option<Vec<String>>,
}

impl GuideFields {
    fn over(self, base: CareGuide) -> CareGuide {
        let pick = |value: Option<String>, default: String| {
            value.filter(|v| !v.trim().is_empty()).unwrap_or(default)
        };
        CareGuide {
            watering: pick(self.watering, base.watering),
            sunlight: pick(self.sunlight, base.sunlight),
            temperature: pick(self.temperature, base.temperature),
            humidity: pick(self.humidity, base.humidity),
            fertilizer: pick(self.fertilizer, base.fertilizer),
            soil: pick(self.soil, base.soil),
            tips: self.tips.filter(|t| !t.is_empty()).unwrap_or(base.tips),
        }
    }
}

/// Text-generator backed care guide
pub struct LlmCareGuide {
    text: Arc<dyn TextGenerator>,
    fallback_to_template: bool,
}

impl LlmCareGuide {
    pub fn new(text: Arc<dyn TextGenerator>, fallback_to_template: bool) -> Self {
        Self {
            text,
            fallback_to_template,
        }
    }

    fn prompt(plant_name: &str) -> String {
        format!(
            "Plant name: {name}\n\n\
             Write an indoor pot care guide for {name} that reflects its specific traits \
             and native habitat: watering, sunlight, temperature range, humidity, \
             fertilizer, soil mix, and care tips unique to this plant (pests, propagation, \
             toxicity).\n\n\
             Return only JSON in this form:\n\
             {{\"watering\": \"...\", \"sunlight\": \"...\", \"temperature\": \"...\", \
             \"humidity\": \"...\", \"fertilizer\": \"...\", \"soil\": \"...\", \
             \"tips\": [\"...\", \"...\", \"...\"]}}",
            name = plant_name
        )
    }

    /// Turn generator output into a guide, never failing
    pub fn parse(content: &str, plant_name: &str) -> CareGuide {
        let base = TemplateCareGuide::guide(plant_name);

        if let Some(block) = extract_json_object(content) {
            match serde_json::from_str::<GuideFields>(block) {
                Ok(fields) => return fields.over(base),
                Err(e) => debug!(error = %e, "Care guide JSON invalid, reading keyword lines"),
            }
        }

        parse_keyword_lines(content).over(base)
    }
}

#[async_trait::async_trait]
impl CareGuideGenerator for LlmCareGuide {
    async fn care_guide(&self, plant_name: &str) -> Result<CareGuide, GeneratorError> {
        let request = TextRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: Self::prompt(plant_name),
            max_tokens: GUIDE_MAX_TOKENS,
        };

        match self.text.generate(&request).await {
            Ok(content) => Ok(Self::parse(&content, plant_name)),
            Err(e) if self.fallback_to_template => {
                warn!(plant = plant_name, error = %e, "Care guide generation failed, using template");
                Ok(TemplateCareGuide::guide(plant_name))
            }
            Err(e) => Err(e),
        }
    }
}

/// First `{` through last `}`, which also strips markdown code fences
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Watering,
    Sunlight,
    Temperature,
    Humidity,
    Fertilizer,
    Soil,
    Tips,
}

fn section_for(label: &str) -> Option<Section> {
    let label = label.to_lowercase();
    let section = if label.contains("water") {
        Section::Watering
    } else if label.contains("sun") || label.contains("light") {
        Section::Sunlight
    } else if label.contains("temperature") {
        Section::Temperature
    } else if label.contains("humidity") {
        Section::Humidity
    } else if label.contains("fertiliz") {
        Section::Fertilizer
    } else if label.contains("soil") {
        Section::Soil
    } else if label.contains("tip") {
        Section::Tips
    } else {
        return None;
    };
    Some(section)
}

/// Read `Keyword: value` lines; bullet lines after a tips heading become tips
fn parse_keyword_lines(text: &str) -> GuideFields {
    let mut fields = GuideFields::default();
    let mut tips = Vec::new();
    let mut current = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let stripped = line.trim_start_matches(['-', '*', '•', '#']).trim();
        let bullet = stripped.len() < line.len();
        let (label, value) = match stripped.split_once(':') {
            Some((label, value)) => (label, value.trim()),
            // A bare bullet is list content, never a heading
            None if bullet => ("", ""),
            None => (stripped, ""),
        };

        if let Some(section) = section_for(label).filter(|_| label.len() <= 40) {
            current = Some(section);
            if value.is_empty() {
                continue;
            }
            let value = value.to_string();
            match section {
                Section::Watering => fields.watering = Some(value),
                Section::Sunlight => fields.sunlight = Some(value),
                Section::Temperature => fields.temperature = Some(value),
                Section::Humidity => fields.humidity = Some(value),
                Section::Fertilizer => fields.fertilizer = Some(value),
                Section::Soil => fields.soil = Some(value),
                Section::Tips => tips.push(value),
            }
        } else if current == Some(Section::Tips) && bullet {
            tips.push(stripped.to_string());
        }
    }

    if !tips.is_empty() {
        fields.tips = Some(tips);
    }
    fields
}
