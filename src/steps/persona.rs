//! Audience persona synthesis.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::generation::{format_instructions, generate_structured, StepFailure};
use crate::prompts::PERSONA;

use super::context::LocalContext;
use super::entities::EntityExtraction;
use super::history::HistorySummary;
use super::input::NormalizedRequest;
use super::trends::TrendSummary;
use super::{to_prompt_json, PipelineStep, StepContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudiencePersona {
    pub segment_name: String,
    pub description: String,
    pub key_pain_points: Vec<String>,
    pub preferred_channels: Vec<String>,
    pub motivation_triggers: Vec<String>,
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["segment_name", "description", "key_pain_points", "preferred_channels", "motivation_triggers"],
        "properties": {
            "segment_name": {
                "type": "string",
                "description": "A brief, descriptive name for this audience segment, e.g. 'Tech-Savvy Young Professionals in Bangalore'."
            },
            "description": {
                "type": "string",
                "description": "2-3 sentences on demographics (age range, occupation) and psychographics (lifestyle, values, interests) specific to the location and campaign."
            },
            "key_pain_points": {
                "type": "array", "items": {"type": "string"},
                "description": "2-3 problems, needs or desires the campaign offer directly addresses."
            },
            "preferred_channels": {
                "type": "array", "items": {"type": "string"},
                "description": "2-3 specific online or offline channels where this segment is reachable in the location, informed by past results when available."
            },
            "motivation_triggers": {
                "type": "array", "items": {"type": "string"},
                "description": "1-2 factors that would make this audience act, e.g. 'Value for Money', 'Convenience', 'Social Proof'."
            }
        }
    })
}

fn check(persona: &mut AudiencePersona) -> Result<(), String> {
    if persona.segment_name.trim().is_empty() {
        return Err("persona has an empty segment_name".into());
    }
    if persona.description.trim().is_empty() {
        return Err("persona has an empty description".into());
    }
    for list in [
        &mut persona.key_pain_points,
        &mut persona.preferred_channels,
        &mut persona.motivation_triggers,
    ] {
        list.retain(|item| !item.trim().is_empty());
    }
    if !(2..=3).contains(&persona.preferred_channels.len()) {
        tracing::debug!(
            count = persona.preferred_channels.len(),
            "persona channel count outside the suggested range"
        );
    }
    Ok(())
}

pub struct PersonaInputs<'a> {
    pub request: &'a NormalizedRequest,
    pub entities: &'a EntityExtraction,
    pub trends: &'a TrendSummary,
    pub context: &'a LocalContext,
    pub history: &'a HistorySummary,
}

/// Fails when the gateway is unavailable, the call fails, or the reply does
/// not fit the persona schema.
pub async fn generate_persona(
    ctx: StepContext<'_>,
    inputs: PersonaInputs<'_>,
) -> Result<AudiencePersona, StepFailure> {
    let step = PipelineStep::Persona;
    let Some(chat) = ctx.services.chat.get() else {
        return Err(StepFailure::new(step, "persona generation is not available: no chat gateway"));
    };

    let user_input = to_prompt_json(inputs.request);
    let entities = to_prompt_json(inputs.entities);
    let trend_data = to_prompt_json(inputs.trends);
    let local_context = to_prompt_json(inputs.context);
    let previous_results = to_prompt_json(inputs.history);
    let instructions = format_instructions(&schema());
    let prompt = PERSONA.render(&[
        ("user_input", user_input.as_str()),
        ("entities", entities.as_str()),
        ("trend_data", trend_data.as_str()),
        ("local_context", local_context.as_str()),
        ("previous_results", previous_results.as_str()),
        ("format_instructions", instructions.as_str()),
    ]);

    let persona = generate_structured(
        chat,
        &ctx.config.models.persona,
        ctx.attribution(step),
        &prompt,
        step,
        check,
    )
    .await?;
    tracing::info!(segment = %persona.segment_name, "persona generated");
    Ok(persona)
}
