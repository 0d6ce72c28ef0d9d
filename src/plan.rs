//! The final campaign plan and its assembly.

use serde::{Deserialize, Serialize};

use crate::steps::allocator::BudgetSplit;
use crate::steps::context::LocalContext;
use crate::steps::creative::CreativeBundle;
use crate::steps::history::HistorySummary;
use crate::steps::persona::AudiencePersona;
use crate::steps::strategy::CampaignStrategy;
use crate::steps::trends::TrendSummary;
use crate::steps::visuals::VisualPrompts;

pub const MISSING_COPY: &str = "N/A";
pub const MISSING_VISUAL: &str = "No visual prompt generated.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignPlan {
    pub campaign_overview: CampaignOverview,
    pub channel_recommendations: Vec<ChannelRecommendation>,
    pub feedback_loop_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignOverview {
    pub suggested_theme_name: String,
    pub strategic_angle: String,
    pub primary_target_audience: AudiencePersona,
    pub timing_recommendation: String,
    pub competitor_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecommendation {
    pub channel_name: String,
    pub allocated_budget: i64,
    pub target_audience_specifics: TargetAudienceSpecifics,
    pub content: ChannelContent,
    pub tracking_info: TrackingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAudienceSpecifics {
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContent {
    pub suggested_copy: String,
    pub visual_prompt: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingType {
    Link,
    QrCode,
}

impl TrackingType {
    /// Ad and online channels get a tracking link; everything else a QR code.
    pub fn for_channel(channel: &str) -> Self {
        if channel.contains("Ads") || channel.contains("Online") {
            Self::Link
        } else {
            Self::QrCode
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    #[serde(rename = "type")]
    pub kind: TrackingType,
}

/// Everything the plan is built from.
pub struct PlanParts<'a> {
    pub persona: &'a AudiencePersona,
    pub strategy: &'a CampaignStrategy,
    pub split: &'a BudgetSplit,
    pub creative: &'a CreativeBundle,
    pub visuals: &'a VisualPrompts,
    pub trends: &'a TrendSummary,
    pub context: &'a LocalContext,
    pub history: &'a HistorySummary,
}

/// Build the plan. Every channel shares the first visual prompt.
pub fn aggregate(parts: PlanParts<'_>) -> CampaignPlan {
    let visual = parts
        .visuals
        .visual_prompts
        .first()
        .map(String::as_str)
        .unwrap_or(MISSING_VISUAL);

    let channel_recommendations = parts
        .strategy
        .recommended_channels
        .iter()
        .map(|channel| ChannelRecommendation {
            channel_name: channel.clone(),
            allocated_budget: parts.split.get(channel).copied().unwrap_or(0),
            target_audience_specifics: TargetAudienceSpecifics {
                details: format!("Targeting based on persona for {channel}"),
            },
            content: ChannelContent {
                suggested_copy: parts
                    .creative
                    .copy_for(channel)
                    .unwrap_or(MISSING_COPY)
                    .to_string(),
                visual_prompt: visual.to_string(),
                call_to_action: format!("Engage via {channel}!"),
            },
            tracking_info: TrackingInfo {
                kind: TrackingType::for_channel(channel),
            },
        })
        .collect();

    CampaignPlan {
        campaign_overview: CampaignOverview {
            suggested_theme_name: parts.strategy.campaign_angle.clone(),
            strategic_angle: parts.strategy.campaign_angle.clone(),
            primary_target_audience: parts.persona.clone(),
            timing_recommendation: parts.trends.timing_recommendation.clone(),
            competitor_note: parts.context.competitor_types_summary.clone(),
        },
        channel_recommendations,
        feedback_loop_note: parts.history.previous_campaign_summary.clone(),
    }
}

/// Check the assembled plan against the output contract.
pub fn validate(plan: &CampaignPlan, total_budget: u64) -> Result<(), String> {
    if plan.channel_recommendations.is_empty() {
        return Err("plan has no channel recommendations".into());
    }
    let mut sum: i128 = 0;
    for rec in &plan.channel_recommendations {
        if rec.channel_name.trim().is_empty() {
            return Err("channel recommendation has an empty channel_name".into());
        }
        if rec.allocated_budget < 0 {
            return Err(format!(
                "channel {:?} has a negative budget ({})",
                rec.channel_name, rec.allocated_budget
            ));
        }
        if rec.content.suggested_copy.trim().is_empty() {
            return Err(format!("channel {:?} has empty copy", rec.channel_name));
        }
        sum += i128::from(rec.allocated_budget);
    }
    if sum != i128::from(total_budget) {
        return Err(format!(
            "allocated budgets sum to {sum}, expected {total_budget}"
        ));
    }
    if plan.feedback_loop_note.trim().is_empty() {
        return Err("feedback_loop_note is empty".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn persona() -> AudiencePersona {
        AudiencePersona {
            segment_name: "Students".into(),
            description: "Young and social.".into(),
            key_pain_points: vec!["Price".into()],
            preferred_channels: vec!["Instagram".into()],
            motivation_triggers: vec!["Value".into()],
        }
    }

    fn strategy() -> CampaignStrategy {
        CampaignStrategy {
            recommended_channels: vec!["Instagram Ads".into(), "Pamphlets".into()],
            budget_split: [("Instagram Ads".to_string(), 3500), ("Pamphlets".to_string(), 2500)]
                .into_iter()
                .collect(),
            campaign_angle: "Diwali Delights".into(),
            justification: "Pamphlets converted best.".into(),
        }
    }

    fn build(creative: CreativeBundle, visuals: VisualPrompts) -> CampaignPlan {
        let persona = persona();
        let strategy = strategy();
        let trends = TrendSummary {
            timing_recommendation: "Start a week before Diwali.".into(),
            related_queries: vec![],
        };
        let context = LocalContext {
            local_events_summary: "Diwali fairs".into(),
            competitor_types_summary: "Chains and bakeries".into(),
        };
        let history = HistorySummary::none();
        aggregate(PlanParts {
            persona: &persona,
            strategy: &strategy,
            split: &strategy.budget_split,
            creative: &creative,
            visuals: &visuals,
            trends: &trends,
            context: &context,
            history: &history,
        })
    }

    fn creative() -> CreativeBundle {
        let mut channel_copy = IndexMap::new();
        channel_copy.insert("instagram_ads_copy".to_string(), "Tap the link".to_string());
        channel_copy.insert("pamphlets_copy".to_string(), "Scan the QR".to_string());
        CreativeBundle { channel_copy }
    }

    #[test]
    fn every_channel_gets_budget_copy_and_first_visual() {
        let plan = build(
            creative(),
            VisualPrompts {
                visual_prompts: vec!["lamps".into(), "sweets".into()],
            },
        );
        assert_eq!(plan.channel_recommendations.len(), 2);
        let ig = &plan.channel_recommendations[0];
        assert_eq!(ig.allocated_budget, 3500);
        assert_eq!(ig.content.suggested_copy, "Tap the link");
        assert_eq!(ig.content.call_to_action, "Engage via Instagram Ads!");
        assert_eq!(ig.tracking_info.kind, TrackingType::Link);
        let pamphlets = &plan.channel_recommendations[1];
        assert_eq!(pamphlets.tracking_info.kind, TrackingType::QrCode);
        assert!(plan
            .channel_recommendations
            .iter()
            .all(|c| c.content.visual_prompt == "lamps"));
        assert_eq!(plan.campaign_overview.suggested_theme_name, "Diwali Delights");
        assert_eq!(plan.feedback_loop_note, "No previous campaign data found.");
        assert!(validate(&plan, 6000).is_ok());
    }

    #[test]
    fn missing_pieces_fall_back_to_placeholders() {
        let plan = build(
            CreativeBundle::default(),
            VisualPrompts {
                visual_prompts: vec![],
            },
        );
        let rec = &plan.channel_recommendations[0];
        assert_eq!(rec.content.suggested_copy, MISSING_COPY);
        assert_eq!(rec.content.visual_prompt, MISSING_VISUAL);
    }

    #[test]
    fn validate_rejects_wrong_total() {
        let plan = build(
            creative(),
            VisualPrompts {
                visual_prompts: vec!["a".into(), "b".into()],
            },
        );
        let err = validate(&plan, 7000).unwrap_err();
        assert!(err.contains("6000"));
    }

    #[test]
    fn tracking_info_serializes_as_type() {
        let info = TrackingInfo {
            kind: TrackingType::QrCode,
        };
        assert_eq!(
            serde_json::to_value(info).unwrap(),
            serde_json::json!({"type": "qr_code"})
        );
    }
}
