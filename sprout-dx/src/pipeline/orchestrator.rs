//! Generator fan-out
//!
//! Decides which generators a request needs and runs them together on the
//! worker pool. The join waits for every scheduled task; a task that fails,
//! panics or times out only degrades its own outcome.
//!
//! # Tier policy (diagnosis)
//! - **High:** treatment advisor, keyed on the top detection
//! - **Medium / Low / None:** no advisor
//!
//! # Species analysis
//! Care guide and growth prediction always run, for the identified plant or
//! for the generic subject when confidence is below the generic floor.

use crate::pipeline::pool::{PoolError, WorkerPool};
use crate::pipeline::tiering::ConfidenceTierClassifier;
use crate::types::{
    CareGuide, CareGuideGenerator, ClassificationResult, DiagnosisTier, GeneratorError,
    GeneratorOutcome, GrowthPrediction, GrowthPredictor, TreatmentAdvisor, TreatmentRequest,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Injected generator implementations
#[derive(Clone)]
pub struct Generators {
    pub advisor: Arc<dyn TreatmentAdvisor>,
    pub care_guide: Arc<dyn CareGuideGenerator>,
    pub growth: Arc<dyn GrowthPredictor>,
}

/// Generators to run for one request; `None` means not scheduled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPlan {
    pub treatment: Option<TreatmentRequest>,
    /// Plant name for the care guide
    pub care_guide: Option<String>,
    /// Plant name for the growth prediction
    pub growth: Option<String>,
}

impl TaskPlan {
    pub fn is_empty(&self) -> bool {
        self.treatment.is_none() && self.care_guide.is_none() && self.growth.is_none()
    }
}

/// Joined results; a field is `None` exactly when its task was not scheduled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutcomes {
    pub treatment: Option<GeneratorOutcome<String>>,
    pub care_guide: Option<GeneratorOutcome<CareGuide>>,
    pub growth: Option<GeneratorOutcome<GrowthPrediction>>,
}

impl TaskOutcomes {
    /// `(generator, error summary)` for every failed task
    pub fn failures(&self) -> Vec<(&'static str, String)> {
        let mut failures = Vec::new();
        if let Some(summary) = self.treatment.as_ref().and_then(|o| o.error_summary()) {
            failures.push(("treatment_advice", summary.to_string()));
        }
        if let Some(summary) = self.care_guide.as_ref().and_then(|o| o.error_summary()) {
            failures.push(("care_guide", summary.to_string()));
        }
        if let Some(summary) = self.growth.as_ref().and_then(|o| o.error_summary()) {
            failures.push(("growth_prediction", summary.to_string()));
        }
        failures
    }
}

/// Schedules and joins generator tasks
pub struct TaskOrchestrator {
    generators: Generators,
    pool: Arc<WorkerPool>,
    tiers: ConfidenceTierClassifier,
    generic_subject: String,
    timeout: Duration,
}

impl TaskOrchestrator {
    pub fn new(
        generators: Generators,
        pool: Arc<WorkerPool>,
        tiers: ConfidenceTierClassifier,
        generic_subject: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            generators,
            pool,
            tiers,
            generic_subject: generic_subject.into(),
            timeout,
        }
    }

    pub fn advisor_available(&self) -> bool {
        self.generators.advisor.is_available()
    }

    /// Plan for a diagnosis request
    ///
    /// With `include_care_guide`, Medium and High results also get a care
    /// guide for the detected subject, scheduled alongside the advisor.
    pub fn plan_diagnosis(
        &self,
        result: &ClassificationResult,
        user_notes: Option<&str>,
        include_care_guide: bool,
    ) -> TaskPlan {
        let mut plan = TaskPlan::default();
        let Some(top) = result.top() else {
            return plan;
        };

        if result.tier == DiagnosisTier::High {
            plan.treatment = Some(TreatmentRequest {
                subject: top.subject_name().to_string(),
                issue: top.label.clone(),
                confidence: result.max_confidence,
                user_notes: user_notes
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            });
        }

        let actionable = matches!(result.tier, DiagnosisTier::High | DiagnosisTier::Medium);
        if include_care_guide && actionable {
            plan.care_guide = Some(top.subject_name().to_string());
        }

        plan
    }

    /// Plan for a species analysis request
    pub fn plan_species(&self, plant_name: &str, confidence: f64) -> TaskPlan {
        let subject = if self.tiers.below_generic_floor(confidence) || plant_name.trim().is_empty() {
            self.generic_subject.clone()
        } else {
            plant_name.to_string()
        };

        TaskPlan {
            treatment: None,
            care_guide: Some(subject.clone()),
            growth: Some(subject),
        }
    }

    /// Start every scheduled task together and wait for all of them
    pub async fn execute(&self, plan: TaskPlan) -> TaskOutcomes {
        if plan.is_empty() {
            return TaskOutcomes::default();
        }

        debug!(
            treatment = plan.treatment.is_some(),
            care_guide = plan.care_guide.is_some(),
            growth = plan.growth.is_some(),
            "Starting generator tasks"
        );

        let TaskPlan {
            treatment,
            care_guide,
            growth,
        } = plan;

        let treatment = async move {
            let request = treatment?;
            let advisor = Arc::clone(&self.generators.advisor);
            Some(
                self.run_task("treatment_advice", async move { advisor.advise(&request).await })
                    .await,
            )
        };

        let care_guide = async move {
            let subject = care_guide?;
            let generator = Arc::clone(&self.generators.care_guide);
            Some(
                self.run_task("care_guide", async move { generator.care_guide(&subject).await })
                    .await,
            )
        };

        let growth = async move {
            let subject = growth?;
            let predictor = Arc::clone(&self.generators.growth);
            Some(
                self.run_task("growth_prediction", async move { predictor.predict(&subject).await })
                    .await,
            )
        };

        let (treatment, care_guide, growth) = tokio::join!(treatment, care_guide, growth);

        TaskOutcomes {
            treatment,
            care_guide,
            growth,
        }
    }

    async fn run_task<F, T>(&self, name: &'static str, fut: F) -> GeneratorOutcome<T>
    where
        F: Future<Output = Result<T, GeneratorError>> + Send + 'static,
        T: Send + 'static,
    {
        let error = match self.pool.run(name, self.timeout, fut).await {
            Ok(Ok(value)) => return GeneratorOutcome::success(value),
            Ok(Err(e)) => e,
            Err(PoolError::TimedOut { timeout_ms, .. }) => GeneratorError::Timeout {
                generator: name.to_string(),
                timeout_ms,
            },
            Err(e) => GeneratorError::Failure(e.to_string()),
        };

        warn!(generator = name, error = %error, "Generator task failed (field degraded)");
        GeneratorOutcome::failure(&error)
    }
}
