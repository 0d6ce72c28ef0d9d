//! Input normalization: validate the raw request and resolve one budget figure.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request is malformed: {0}")]
    Malformed(String),
    #[error("channel_preference must be one of {allowed:?}, got {value:?}")]
    ChannelPreference {
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("{field} must not be negative, got {value}")]
    NegativeBudget { field: &'static str, value: i64 },
}

/// Where the user wants the campaign to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPreference {
    Online,
    Offline,
    Both,
    #[serde(rename = "AI Recommend", alias = "AIRecommend")]
    AiRecommend,
}

impl ChannelPreference {
    pub const ALLOWED: &'static [&'static str] = &["Online", "Offline", "Both", "AI Recommend"];

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "Online" => Ok(Self::Online),
            "Offline" => Ok(Self::Offline),
            "Both" => Ok(Self::Both),
            "AI Recommend" | "AIRecommend" => Ok(Self::AiRecommend),
            other => Err(ValidationError::ChannelPreference {
                value: other.to_string(),
                allowed: Self::ALLOWED,
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Both => "Both",
            Self::AiRecommend => "AI Recommend",
        }
    }

    /// Whether the strategy must mix online and offline channels.
    pub fn requires_mix(&self) -> bool {
        matches!(self, Self::Both | Self::AiRecommend)
    }
}

impl fmt::Display for ChannelPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The inbound request exactly as the transport delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignRequest {
    pub business_type: String,
    pub location: String,
    pub goal_description: String,
    #[serde(default)]
    pub budget_min: Option<i64>,
    #[serde(default)]
    pub budget_max: Option<i64>,
    #[serde(default)]
    pub budget_fixed: Option<i64>,
    pub channel_preference: String,
    pub user_id: String,
}

/// Which request fields produced the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetBasis {
    Fixed,
    Midpoint,
    Minimum,
    Default,
}

/// A validated request with a single resolved budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRequest {
    pub business_type: String,
    pub location: String,
    pub goal_description: String,
    pub channel_preference: ChannelPreference,
    pub user_id: String,
    pub budget: u64,
    pub budget_basis: BudgetBasis,
}

/// Validate a raw request map and resolve its budget.
pub fn normalize(raw: &Value, default_budget: u64) -> Result<NormalizedRequest, ValidationError> {
    let request: CampaignRequest = serde_json::from_value(raw.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    normalize_request(request, default_budget)
}

/// Floor of `(min + max) / 2` for non-negative bounds, without overflow.
fn floored_midpoint(min: i64, max: i64) -> u64 {
    (min / 2 + max / 2 + (min % 2 + max % 2) / 2) as u64
}

/// Validate an already-typed request and resolve its budget.
///
/// Priority: fixed, then the floored midpoint of min and max, then min alone,
/// then `default_budget`. A lone max is ignored.
pub fn normalize_request(
    request: CampaignRequest,
    default_budget: u64,
) -> Result<NormalizedRequest, ValidationError> {
    let channel_preference = ChannelPreference::parse(&request.channel_preference)?;

    let fields = [
        ("budget_fixed", request.budget_fixed),
        ("budget_min", request.budget_min),
        ("budget_max", request.budget_max),
    ];
    for (field, value) in fields {
        if let Some(v) = value.filter(|v| *v < 0) {
            return Err(ValidationError::NegativeBudget { field, value: v });
        }
    }

    let (budget, budget_basis) = match (request.budget_fixed, request.budget_min, request.budget_max) {
        (Some(fixed), _, _) => (fixed as u64, BudgetBasis::Fixed),
        (None, Some(min), Some(max)) => (floored_midpoint(min, max), BudgetBasis::Midpoint),
        (None, Some(min), None) => (min as u64, BudgetBasis::Minimum),
        (None, None, _) => {
            tracing::warn!(default_budget, "no budget provided, using default");
            (default_budget, BudgetBasis::Default)
        }
    };

    let normalized = NormalizedRequest {
        business_type: request.business_type,
        location: request.location,
        goal_description: request.goal_description,
        channel_preference,
        user_id: request.user_id,
        budget,
        budget_basis,
    };
    tracing::debug!(budget, basis = ?budget_basis, preference = %channel_preference, "request normalized");
    Ok(normalized)
}
