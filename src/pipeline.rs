//! The campaign planning pipeline.
//!
//! Steps run in a fixed order, each consuming only earlier outputs:
//!
//! 1. normalize the request
//! 2. extract entities from the goal
//! 3. look up previous results
//! 4. trend search + summary
//! 5. local events / competitor search + summaries
//! 6. persona
//! 7. strategy (split corrected to the exact budget)
//! 8. deterministic allocation
//! 9. creative copy
//! 10. visual prompts
//! 11. aggregate and validate
//!
//! Steps 2-5 degrade to sentinel values when a collaborator fails. A failure in
//! 6, 7, 9 or 10 ends the run, as does a plan that fails validation.

use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{BudgetSource, PlannerConfig};
use crate::generation::StepFailure;
use crate::plan::{aggregate, validate, CampaignPlan, PlanParts};
use crate::services::Services;
use crate::steps::allocator::allocate_budget;
use crate::steps::context::search_local_context;
use crate::steps::creative::generate_creative;
use crate::steps::entities::extract_entities;
use crate::steps::input::{normalize, ValidationError};
use crate::steps::persona::{generate_persona, PersonaInputs};
use crate::steps::strategy::{generate_strategy, StrategyInputs};
use crate::steps::trends::analyze_trends;
use crate::steps::visuals::generate_visual_prompts;
use crate::steps::{PipelineStep, StepContext};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Step(#[from] StepFailure),
    #[error("generated plan structure invalid: {0}")]
    InvalidPlan(String),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Step(_) => "step_failed",
            Self::InvalidPlan(_) => "invalid_plan",
        }
    }

    /// The step that halted the run, for step failures.
    pub fn failed_step(&self) -> Option<PipelineStep> {
        match self {
            Self::Step(failure) => Some(failure.step),
            _ => None,
        }
    }
}

/// Services plus config: everything needed to plan campaigns.
#[derive(Clone)]
pub struct Planner {
    pub services: Services,
    pub config: PlannerConfig,
}

impl Planner {
    pub fn new(services: Services, config: PlannerConfig) -> Self {
        Self { services, config }
    }

    /// Build collaborators from the environment and `config`.
    pub fn from_config(config: PlannerConfig) -> Self {
        let services = Services::from_config(&config);
        services.log_status();
        Self { services, config }
    }

    pub async fn plan(&self, raw: &Value) -> Result<CampaignPlan, PipelineError> {
        run_pipeline(&self.services, &self.config, raw).await
    }
}

/// Run the whole pipeline for one raw request.
pub async fn run_pipeline(
    services: &Services,
    config: &PlannerConfig,
    raw: &Value,
) -> Result<CampaignPlan, PipelineError> {
    let request = normalize(raw, config.default_budget)?;
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("pipeline", %run_id, user_id = %request.user_id);

    async move {
        let started = Instant::now();
        tracing::info!(budget = request.budget, preference = %request.channel_preference, "pipeline started");
        let ctx = StepContext {
            services,
            config,
            run_id,
            user_id: &request.user_id,
        };

        let entities = extract_entities(ctx, &request.goal_description).await;
        let history = services.history.previous_results(&request.user_id).await;

        let bundle = entities.bundle();
        let keywords = bundle.map(|b| b.trend_keywords()).unwrap_or_default();
        let trends = analyze_trends(ctx, &keywords, &request.location, None).await;
        tracing::debug!(step = %PipelineStep::TrendAnalyzer, timing = %trends.timing_recommendation, "trends ready");

        // Only the context searcher is steered by the extracted event.
        let event = bundle.and_then(|b| b.first_event());
        let context =
            search_local_context(ctx, &request.location, &request.business_type, event).await;
        tracing::debug!(step = %PipelineStep::ContextSearcher, "local context ready");

        let persona = generate_persona(
            ctx,
            PersonaInputs {
                request: &request,
                entities: &entities,
                trends: &trends,
                context: &context,
                history: &history,
            },
        )
        .await?;

        let strategy = generate_strategy(
            ctx,
            StrategyInputs {
                request: &request,
                persona: &persona,
                context: &context,
                history: &history,
            },
        )
        .await?;

        let total = i64::try_from(request.budget).unwrap_or(i64::MAX);
        let allocated = allocate_budget(
            total,
            &strategy.recommended_channels,
            &history.previous_campaign_summary,
        );
        tracing::info!(
            step = %PipelineStep::BudgetAllocator,
            strategy_split = ?strategy.budget_split,
            allocator_split = ?allocated,
            source = ?config.budget_source,
            "budget splits"
        );

        let creative = generate_creative(
            ctx,
            &strategy.campaign_angle,
            &persona,
            &strategy.recommended_channels,
        )
        .await?;

        let visuals =
            generate_visual_prompts(ctx, &strategy.campaign_angle, &persona, &creative).await?;

        let split = match config.budget_source {
            BudgetSource::Strategy => &strategy.budget_split,
            BudgetSource::Allocator => &allocated,
        };
        let plan = aggregate(PlanParts {
            persona: &persona,
            strategy: &strategy,
            split,
            creative: &creative,
            visuals: &visuals,
            trends: &trends,
            context: &context,
            history: &history,
        });
        validate(&plan, request.budget).map_err(|e| {
            tracing::error!(error = %e, "assembled plan failed validation");
            PipelineError::InvalidPlan(e)
        })?;

        tracing::info!(
            channels = plan.channel_recommendations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(plan)
    }
    .instrument(span)
    .await
}
