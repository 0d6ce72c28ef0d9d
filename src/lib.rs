#![forbid(unsafe_code)]

//! # campaign-planner
//!
//! Turns a small-business marketing request (business type, location, goal,
//! budget, channel preference) into a campaign plan: an audience persona, a
//! channel mix with an exact budget split, per-channel ad copy and image
//! prompts.
//!
//! The work is a fixed sequence of steps (see [`pipeline`]). Text generation
//! goes through the [`gateway`], web search through [`search`]; both are
//! injected as [`services::Services`] so a missing credential degrades the
//! affected steps instead of failing startup.

pub mod config;
pub mod gateway;
pub mod generation;
pub mod pipeline;
pub mod plan;
pub mod prompts;
pub mod search;
pub mod server;
pub mod services;
pub mod steps;

pub use config::PlannerConfig;
pub use gateway::{Attribution, ChatGateway, ProviderGateway, UsageSink};
pub use generation::StepFailure;
pub use pipeline::{run_pipeline, PipelineError, Planner};
pub use plan::CampaignPlan;
pub use search::{SearchOutcome, WebSearch};
pub use services::{Collaborator, Services};
