//! Channel mix, budget split and campaign angle.
//!
//! The model proposes a split; the split that leaves this module always covers
//! exactly the recommended channels, has no negative amounts, and sums to the
//! request budget.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::generation::{format_instructions, generate_structured, StepFailure};
use crate::prompts::STRATEGY;

use super::allocator::{clamp_negatives, correct_to_total, BudgetSplit};
use super::context::LocalContext;
use super::history::HistorySummary;
use super::input::{ChannelPreference, NormalizedRequest};
use super::persona::AudiencePersona;
use super::{to_prompt_json, PipelineStep, StepContext};

const ONLINE_MARKERS: &[&str] = &[
    "ads", "online", "instagram", "facebook", "whatsapp", "google", "youtube", "social", "email",
    "sms", "website", "seo", "influencer", "zomato", "swiggy", "digital", "reels",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Online,
    Offline,
}

impl ChannelKind {
    /// Best-effort classification from the channel name.
    pub fn classify(channel: &str) -> Self {
        let lower = channel.to_lowercase();
        let online = lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| ONLINE_MARKERS.contains(&word));
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignStrategy {
    pub recommended_channels: Vec<String>,
    pub budget_split: BudgetSplit,
    pub campaign_angle: String,
    pub justification: String,
}

#[derive(Debug, Deserialize)]
struct ProposedStrategy {
    recommended_channels: Vec<String>,
    #[serde(default)]
    budget_split: IndexMap<String, f64>,
    campaign_angle: String,
    #[serde(default)]
    justification: String,
}

fn schema(total_budget: u64) -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["recommended_channels", "budget_split", "campaign_angle", "justification"],
        "properties": {
            "recommended_channels": {
                "type": "array", "items": {"type": "string"},
                "description": "1-3 specific marketing channels, e.g. 'Facebook Local Ads', 'Pamphlets', 'WhatsApp Promotion'."
            },
            "budget_split": {
                "type": "object", "additionalProperties": {"type": "integer"},
                "description": format!("Channel name to integer INR amount. Keys are exactly the recommended channels; values sum to {total_budget}.")
            },
            "campaign_angle": {
                "type": "string",
                "description": "A short, catchy strategic theme for the campaign."
            },
            "justification": {
                "type": "string",
                "description": "2-3 sentences justifying channels and split, citing audience, local context, competitors and previous results."
            }
        }
    })
}

/// Trim, drop blanks and repeated names, keeping first positions.
fn dedupe_channels(channels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(channels.len());
    for channel in channels {
        let channel = channel.trim().to_string();
        if !channel.is_empty() && !out.contains(&channel) {
            out.push(channel);
        }
    }
    out
}

/// Restrict a proposed split to `channels`.
///
/// Keys match channels case-insensitively and keep the proposal's order.
/// Unknown keys are dropped and channels the proposal skipped get 0.
pub fn align_split(proposed: &IndexMap<String, i64>, channels: &[String]) -> BudgetSplit {
    let canonical = |key: &str| {
        let key = key.trim();
        channels
            .iter()
            .find(|c| c.eq_ignore_ascii_case(key))
            .cloned()
    };

    let mut split = BudgetSplit::new();
    for (key, &amount) in proposed {
        match canonical(key) {
            Some(channel) => {
                let entry = split.entry(channel).or_insert(0);
                *entry = entry.saturating_add(amount);
            }
            None => tracing::warn!(channel = %key, "dropping budget for unrecommended channel"),
        }
    }
    for channel in channels {
        split.entry(channel.clone()).or_insert(0);
    }
    split
}

/// Reject proposed amounts that are not numbers or that exceed the whole
/// budget. Moderate negatives pass and are clamped later.
fn check_amounts(split: &IndexMap<String, f64>, total: u64) -> Result<(), String> {
    for (channel, amount) in split {
        if !amount.is_finite() || *amount < i64::MIN as f64 {
            return Err(format!("budget_split[{channel}] is not a usable amount: {amount}"));
        }
        if *amount > total as f64 {
            return Err(format!(
                "budget_split[{channel}] = {amount} exceeds the total budget {total}"
            ));
        }
    }
    Ok(())
}

/// Force `split` to sum to `total` with no negative amounts.
///
/// The difference goes to the first largest channel. If that drives a channel
/// below zero it is clamped and the difference re-applied, until stable.
pub fn reconcile_split(split: &mut BudgetSplit, total: i64) {
    if let Some((channel, diff)) = correct_to_total(split, total) {
        tracing::info!(%channel, diff, "adjusted budget split to match total");
    }
    for _ in 0..=split.len() {
        if !clamp_negatives(split) {
            break;
        }
        tracing::warn!("budget correction produced a negative amount, re-correcting");
        correct_to_total(split, total);
    }
}

fn check_mix(strategy: &CampaignStrategy, preference: ChannelPreference, total: u64, low_budget: u64) {
    let kinds: Vec<ChannelKind> = strategy
        .recommended_channels
        .iter()
        .map(|c| ChannelKind::classify(c))
        .collect();
    let has_online = kinds.contains(&ChannelKind::Online);
    let has_offline = kinds.contains(&ChannelKind::Offline);
    let mismatch = match preference {
        ChannelPreference::Online => has_offline,
        ChannelPreference::Offline => has_online,
        ChannelPreference::Both | ChannelPreference::AiRecommend => {
            total >= low_budget && !(has_online && has_offline)
        }
    };
    if mismatch {
        tracing::warn!(
            %preference,
            channels = ?strategy.recommended_channels,
            "recommended channels may not match the channel preference"
        );
    }
}

pub struct StrategyInputs<'a> {
    pub request: &'a NormalizedRequest,
    pub persona: &'a AudiencePersona,
    pub context: &'a LocalContext,
    pub history: &'a HistorySummary,
}

pub async fn generate_strategy(
    ctx: StepContext<'_>,
    inputs: StrategyInputs<'_>,
) -> Result<CampaignStrategy, StepFailure> {
    let step = PipelineStep::Strategy;
    let Some(chat) = ctx.services.chat.get() else {
        return Err(StepFailure::new(step, "strategy generation is not available: no chat gateway"));
    };

    let total = inputs.request.budget;
    let user_input = to_prompt_json(inputs.request);
    let persona = to_prompt_json(inputs.persona);
    let local_context = to_prompt_json(inputs.context);
    let previous_results = to_prompt_json(inputs.history);
    let total_budget = total.to_string();
    let threshold = ctx.config.low_budget_threshold.to_string();
    let instructions = format_instructions(&schema(total));
    let prompt = STRATEGY.render(&[
        ("user_input", user_input.as_str()),
        ("audience_persona", persona.as_str()),
        ("local_context", local_context.as_str()),
        ("previous_results", previous_results.as_str()),
        ("total_budget", total_budget.as_str()),
        ("channel_preference", inputs.request.channel_preference.as_str()),
        ("low_budget_threshold", threshold.as_str()),
        ("format_instructions", instructions.as_str()),
    ]);

    let proposed: ProposedStrategy = generate_structured(
        chat,
        &ctx.config.models.strategy,
        ctx.attribution(step),
        &prompt,
        step,
        |p: &mut ProposedStrategy| {
            p.recommended_channels = dedupe_channels(std::mem::take(&mut p.recommended_channels));
            if p.recommended_channels.is_empty() {
                return Err("strategy recommended no channels".into());
            }
            if p.campaign_angle.trim().is_empty() {
                return Err("strategy has an empty campaign_angle".into());
            }
            check_amounts(&p.budget_split, total)
        },
    )
    .await?;

    let raw: IndexMap<String, i64> = proposed
        .budget_split
        .iter()
        .map(|(k, v)| (k.clone(), v.round() as i64))
        .collect();
    let mut budget_split = align_split(&raw, &proposed.recommended_channels);
    reconcile_split(&mut budget_split, i64::try_from(total).unwrap_or(i64::MAX));

    let strategy = CampaignStrategy {
        recommended_channels: proposed.recommended_channels,
        budget_split,
        campaign_angle: proposed.campaign_angle.trim().to_string(),
        justification: proposed.justification.trim().to_string(),
    };
    check_mix(
        &strategy,
        inputs.request.channel_preference,
        total,
        ctx.config.low_budget_threshold,
    );
    tracing::info!(channels = ?strategy.recommended_channels, "strategy generated");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(pairs: &[(&str, i64)]) -> IndexMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn surplus_goes_to_first_largest() {
        let mut s = split(&[("A", 1000), ("B", 1000)]);
        reconcile_split(&mut s, 2500);
        assert_eq!(s, split(&[("A", 1500), ("B", 1000)]));
    }

    #[test]
    fn deficit_is_taken_from_largest() {
        let mut s = split(&[("A", 1000), ("B", 4000)]);
        reconcile_split(&mut s, 3000);
        assert_eq!(s, split(&[("A", 1000), ("B", 2000)]));
    }

    #[test]
    fn negative_results_are_clamped_and_recorrected() {
        let mut s = split(&[("A", 900), ("B", 800), ("C", 700)]);
        reconcile_split(&mut s, 500);
        assert!(s.values().all(|v| *v >= 0));
        assert_eq!(s.values().sum::<i64>(), 500);
    }

    #[test]
    fn negative_proposals_are_clamped() {
        let mut s = split(&[("A", -200), ("B", 1200)]);
        reconcile_split(&mut s, 1000);
        assert_eq!(s, split(&[("A", 0), ("B", 1000)]));
    }

    #[test]
    fn huge_amounts_reconcile_without_overflow() {
        let half = i64::MAX / 2 + 1;
        let mut s = split(&[("A", half), ("B", half)]);
        reconcile_split(&mut s, 6000);
        assert_eq!(s, split(&[("A", 0), ("B", 6000)]));
    }

    #[test]
    fn amounts_beyond_the_budget_are_rejected() {
        let proposed = |v: f64| -> IndexMap<String, f64> {
            [("Pamphlets".to_string(), 1000.0), ("Radio".to_string(), v)].into_iter().collect()
        };
        assert!(check_amounts(&proposed(5000.0), 6000).is_ok());
        assert!(check_amounts(&proposed(-200.0), 6000).is_ok());

        let err = check_amounts(&proposed(1e30), 6000).unwrap_err();
        assert!(err.contains("exceeds the total budget 6000"));
        assert!(check_amounts(&proposed(f64::NEG_INFINITY), 6000).is_err());
        assert!(check_amounts(&proposed(f64::NAN), 6000).is_err());
        assert!(check_amounts(&proposed(-1e30), 6000).is_err());
    }

    #[test]
    fn case_variant_keys_merge_without_overflow() {
        let proposed = split(&[("Radio", i64::MAX), ("radio", i64::MAX)]);
        let aligned = align_split(&proposed, &names(&["Radio"]));
        assert_eq!(aligned, split(&[("Radio", i64::MAX)]));
    }

    #[test]
    fn align_drops_unknown_keys_and_fills_missing_channels() {
        let proposed = split(&[("pamphlets", 2000), ("Radio", 500), ("Instagram Ads", 3000)]);
        let aligned = align_split(&proposed, &names(&["Instagram Ads", "Pamphlets", "WhatsApp Broadcast"]));
        assert_eq!(
            aligned,
            split(&[("Pamphlets", 2000), ("Instagram Ads", 3000), ("WhatsApp Broadcast", 0)])
        );
    }

    #[test]
    fn channels_are_deduplicated_in_order() {
        assert_eq!(
            dedupe_channels(names(&["Pamphlets", " Instagram Ads ", "Pamphlets", ""])),
            names(&["Pamphlets", "Instagram Ads"])
        );
    }

    #[test]
    fn channel_kinds() {
        assert_eq!(ChannelKind::classify("Instagram Stories Ads"), ChannelKind::Online);
        assert_eq!(ChannelKind::classify("WhatsApp Broadcast (Manual)"), ChannelKind::Online);
        assert_eq!(ChannelKind::classify("Pamphlet Distribution near Colleges"), ChannelKind::Offline);
        assert_eq!(ChannelKind::classify("Banner at Local Market"), ChannelKind::Offline);
    }
}
