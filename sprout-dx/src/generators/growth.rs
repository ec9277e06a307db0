//! Growth prediction

use crate::types::{GeneratorError, GrowthPrediction, GrowthPredictor, GrowthStage};

/// Fixed four-stage outlook keyed on the plant name
#[derive(Debug, Clone, Copy, Default)]
pub struct StagedGrowthPredictor;

impl StagedGrowthPredictor {
    pub fn stages(plant_name: &str) -> Vec<GrowthStage> {
        let stage = |stage: &str, timeframe: &str, description: String| GrowthStage {
            stage: stage.to_string(),
            timeframe: timeframe.to_string(),
            image_url: None,
            description,
        };

        vec![
            stage(
                "current",
                "Now",
                format!("{} is in its early stage, adapting to a new environment.", plant_name),
            ),
            stage(
                "1_month",
                "In 1 month",
                "New leaves start to appear as the roots settle in.".to_string(),
            ),
            stage(
                "3_months",
                "In 3 months",
                "A mature look with full foliage and healthy stems.".to_string(),
            ),
            stage(
                "6_months",
                "In 6 months",
                format!("A fully grown {}.", plant_name),
            ),
        ]
    }
}

#[async_trait::async_trait]
impl GrowthPredictor for StagedGrowthPredictor {
    async fn predict(&self, plant_name: &str) -> Result<GrowthPrediction, GeneratorError> {
        Ok(GrowthPrediction {
            stages: Self::stages(plant_name),
        })
    }
}
