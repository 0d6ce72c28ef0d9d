//! The pipeline stages, in dependency order.
//!
//! Each stage consumes only the outputs of earlier stages. Stages that talk to a
//! collaborator receive a [`StepContext`] carrying the shared service handles,
//! the config, and the run's identity for attribution.

pub mod allocator;
pub mod context;
pub mod creative;
pub mod entities;
pub mod history;
pub mod input;
pub mod lexicon;
pub mod persona;
pub mod strategy;
pub mod trends;
pub mod visuals;

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::gateway::Attribution;
use crate::services::Services;

/// Pipeline stage identifiers, used for attribution, logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    InputNormalizer,
    EntityExtractor,
    HistoryLookup,
    TrendAnalyzer,
    ContextSearcher,
    Persona,
    Strategy,
    BudgetAllocator,
    Creative,
    Visuals,
    Aggregator,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputNormalizer => "input_normalizer",
            Self::EntityExtractor => "entity_extractor",
            Self::HistoryLookup => "history_lookup",
            Self::TrendAnalyzer => "trend_analyzer",
            Self::ContextSearcher => "context_searcher",
            Self::Persona => "persona",
            Self::Strategy => "strategy",
            Self::BudgetAllocator => "budget_allocator",
            Self::Creative => "creative",
            Self::Visuals => "visuals",
            Self::Aggregator => "aggregator",
        }
    }

    /// Static caller tag for gateway attribution.
    pub fn caller(&self) -> &'static str {
        match self {
            Self::InputNormalizer => "step::input_normalizer",
            Self::EntityExtractor => "step::entity_extractor",
            Self::HistoryLookup => "step::history_lookup",
            Self::TrendAnalyzer => "step::trend_analyzer",
            Self::ContextSearcher => "step::context_searcher",
            Self::Persona => "step::persona",
            Self::Strategy => "step::strategy",
            Self::BudgetAllocator => "step::budget_allocator",
            Self::Creative => "step::creative",
            Self::Visuals => "step::visuals",
            Self::Aggregator => "step::aggregator",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, read-only inputs every collaborator-facing step needs.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub services: &'a Services,
    pub config: &'a PlannerConfig,
    pub run_id: Uuid,
    pub user_id: &'a str,
}

impl<'a> StepContext<'a> {
    pub fn attribution(&self, step: PipelineStep) -> Attribution {
        Attribution::new(step.caller())
            .with_run(self.run_id)
            .with_user(self.user_id)
    }
}

/// Serialize a prompt input for embedding in a template.
pub(crate) fn to_prompt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
