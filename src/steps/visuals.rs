//! Image-generation prompts for the campaign.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::generation::{format_instructions, generate_structured, StepFailure};
use crate::prompts::VISUALS;

use super::creative::CreativeBundle;
use super::persona::AudiencePersona;
use super::{to_prompt_json, PipelineStep, StepContext};

pub const PROMPT_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualPrompts {
    pub visual_prompts: Vec<String>,
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["visual_prompts"],
        "properties": {
            "visual_prompts": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": PROMPT_COUNT,
                "maxItems": PROMPT_COUNT,
                "description": "Exactly 2 concise but descriptive prompts for an image model (DALL-E 3, Stable Diffusion) reflecting the angle and audience in an Indian context."
            }
        }
    })
}

fn check(reply: &mut VisualPrompts) -> Result<(), String> {
    reply.visual_prompts.retain(|p| !p.trim().is_empty());
    let count = reply.visual_prompts.len();
    if count < PROMPT_COUNT {
        return Err(format!("expected {PROMPT_COUNT} visual prompts, got {count}"));
    }
    if count > PROMPT_COUNT {
        tracing::warn!(count, "truncating extra visual prompts");
        reply.visual_prompts.truncate(PROMPT_COUNT);
    }
    Ok(())
}

pub async fn generate_visual_prompts(
    ctx: StepContext<'_>,
    campaign_angle: &str,
    persona: &AudiencePersona,
    creative: &CreativeBundle,
) -> Result<VisualPrompts, StepFailure> {
    let step = PipelineStep::Visuals;
    let Some(chat) = ctx.services.chat.get() else {
        return Err(StepFailure::new(step, "visual prompt generation is not available: no chat gateway"));
    };

    let persona_json = to_prompt_json(persona);
    let copy_json = to_prompt_json(creative);
    let instructions = format_instructions(&schema());
    let prompt = VISUALS.render(&[
        ("campaign_angle", campaign_angle),
        ("audience_persona", persona_json.as_str()),
        ("creative_content", copy_json.as_str()),
        ("format_instructions", instructions.as_str()),
    ]);

    generate_structured(
        chat,
        &ctx.config.models.visuals,
        ctx.attribution(step),
        &prompt,
        step,
        check,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts(list: &[&str]) -> VisualPrompts {
        VisualPrompts {
            visual_prompts: list.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn exactly_two_pass() {
        let mut v = prompts(&["diya-lit cafe counter", "friends sharing chai"]);
        assert!(check(&mut v).is_ok());
    }

    #[test]
    fn too_few_fail_after_dropping_blanks() {
        let mut v = prompts(&["diya-lit cafe counter", "  "]);
        assert!(check(&mut v).unwrap_err().contains("got 1"));
    }

    #[test]
    fn extras_are_truncated() {
        let mut v = prompts(&["a", "b", "c"]);
        check(&mut v).unwrap();
        assert_eq!(v.visual_prompts, vec!["a", "b"]);
    }
}
