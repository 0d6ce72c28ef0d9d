//! Channel-specific ad copy.
//!
//! The reply shape depends on the request: one copy field per recommended
//! channel, keyed by [`copy_key`]. The aggregator looks copy up through the
//! same function.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::generation::{format_instructions, generate_structured, StepFailure};
use crate::prompts::CREATIVE;

use super::persona::AudiencePersona;
use super::{to_prompt_json, PipelineStep, StepContext};

/// Copy text that counts as missing.
const PLACEHOLDER: &str = "N/A";

/// Field name for a channel's copy: lowercased, spaces and hyphens to `_`,
/// `&` to `and`, periods removed, suffixed `_copy`.
pub fn copy_key(channel: &str) -> String {
    let mut key = channel
        .to_lowercase()
        .replace([' ', '-'], "_")
        .replace('&', "and")
        .replace('.', "");
    key.push_str("_copy");
    key
}

/// Copy per channel, keyed by [`copy_key`], in channel order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreativeBundle {
    pub channel_copy: IndexMap<String, String>,
}

impl CreativeBundle {
    pub fn copy_for(&self, channel: &str) -> Option<&str> {
        self.channel_copy.get(&copy_key(channel)).map(String::as_str)
    }
}

fn channel_brief(channel: &str, angle: &str) -> String {
    format!(
        "1-2 concise, compelling copy snippets for the '{channel}' channel only. Use the campaign angle '{angle}', speak to the persona, include placeholders like [Shop Name], [Offer Details], [Dates], [Address], and say where the tracking link or QR code goes."
    )
}

/// Expected keys and the JSON schema requiring each of them.
fn dynamic_schema(channels: &[String], angle: &str) -> (Vec<String>, serde_json::Value) {
    let mut keys = Vec::new();
    let mut properties = serde_json::Map::new();
    for channel in channels {
        let key = copy_key(channel);
        if keys.contains(&key) {
            continue;
        }
        properties.insert(
            key.clone(),
            json!({"type": "string", "description": channel_brief(channel, angle)}),
        );
        keys.push(key);
    }
    let schema = json!({
        "type": "object",
        "required": keys,
        "properties": properties,
    });
    (keys, schema)
}

fn channel_sections(channels: &[String], angle: &str) -> String {
    channels
        .iter()
        .map(|c| format!("- **{c}** (JSON key: `{}`): {}", copy_key(c), channel_brief(c, angle)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep exactly the expected keys, in order, and reject missing or
/// placeholder copy.
fn validate_copy(
    reply: &mut IndexMap<String, String>,
    expected: &[String],
) -> Result<(), String> {
    let mut missing = Vec::new();
    let mut ordered = IndexMap::with_capacity(expected.len());
    for key in expected {
        match reply.swap_remove(key) {
            Some(text) if !text.trim().is_empty() && text.trim() != PLACEHOLDER => {
                ordered.insert(key.clone(), text.trim().to_string());
            }
            _ => missing.push(key.as_str()),
        }
    }
    if !missing.is_empty() {
        return Err(format!("missing copy for keys: {}", missing.join(", ")));
    }
    if !reply.is_empty() {
        tracing::debug!(extra = ?reply.keys().collect::<Vec<_>>(), "ignoring unexpected copy keys");
    }
    *reply = ordered;
    Ok(())
}

pub async fn generate_creative(
    ctx: StepContext<'_>,
    campaign_angle: &str,
    persona: &AudiencePersona,
    channels: &[String],
) -> Result<CreativeBundle, StepFailure> {
    let step = PipelineStep::Creative;
    let Some(chat) = ctx.services.chat.get() else {
        return Err(StepFailure::new(step, "creative writing is not available: no chat gateway"));
    };
    if channels.is_empty() {
        return Ok(CreativeBundle::default());
    }

    let (expected, schema) = dynamic_schema(channels, campaign_angle);
    let sections = channel_sections(channels, campaign_angle);
    let persona_json = to_prompt_json(persona);
    let channel_list = channels.join(", ");
    let instructions = format_instructions(&schema);
    let prompt = CREATIVE.render_with_trusted(
        &[("channel_sections", sections.as_str())],
        &[
            ("campaign_angle", campaign_angle),
            ("audience_persona", persona_json.as_str()),
            ("channel_list", channel_list.as_str()),
            ("format_instructions", instructions.as_str()),
        ],
    );

    let channel_copy = generate_structured(
        chat,
        &ctx.config.models.creative,
        ctx.attribution(step),
        &prompt,
        step,
        |reply: &mut IndexMap<String, String>| validate_copy(reply, &expected),
    )
    .await?;
    tracing::info!(channels = channel_copy.len(), "creative copy generated");
    Ok(CreativeBundle { channel_copy })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_keys_normalize_channel_names() {
        assert_eq!(copy_key("Instagram Stories Ads"), "instagram_stories_ads_copy");
        assert_eq!(copy_key("Pamphlet Distribution"), "pamphlet_distribution_copy");
        assert_eq!(copy_key("Banner & Signage"), "banner_and_signage_copy");
        assert_eq!(copy_key("Sq.ft Posters"), "sqft_posters_copy");
        assert_eq!(copy_key("Walk-in Offers"), "walk_in_offers_copy");
    }

    #[test]
    fn schema_requires_one_key_per_channel() {
        let channels = vec!["Instagram Ads".to_string(), "Pamphlets".to_string()];
        let (keys, schema) = dynamic_schema(&channels, "Festive Brews");
        assert_eq!(keys, vec!["instagram_ads_copy", "pamphlets_copy"]);
        assert_eq!(schema["required"], json!(["instagram_ads_copy", "pamphlets_copy"]));
        assert!(schema["properties"]["pamphlets_copy"]["description"]
            .as_str()
            .unwrap()
            .contains("'Pamphlets'"));
    }

    #[test]
    fn validate_rejects_missing_and_placeholder_copy() {
        let expected = vec!["a_copy".to_string(), "b_copy".to_string()];
        let mut reply: IndexMap<String, String> =
            [("a_copy".to_string(), "Visit us!".to_string()), ("b_copy".into(), "N/A".into())]
                .into_iter()
                .collect();
        let err = validate_copy(&mut reply, &expected).unwrap_err();
        assert!(err.contains("b_copy"));
    }

    #[test]
    fn validate_orders_and_drops_extra_keys() {
        let expected = vec!["a_copy".to_string(), "b_copy".to_string()];
        let mut reply: IndexMap<String, String> = [
            ("b_copy".to_string(), " Scan the QR ".to_string()),
            ("extra".into(), "x".into()),
            ("a_copy".into(), "Tap the link".into()),
        ]
        .into_iter()
        .collect();
        validate_copy(&mut reply, &expected).unwrap();
        assert_eq!(
            reply.iter().collect::<Vec<_>>(),
            vec![
                (&"a_copy".to_string(), &"Tap the link".to_string()),
                (&"b_copy".to_string(), &"Scan the QR".to_string()),
            ]
        );
    }

    #[test]
    fn bundle_lookup_uses_shared_key() {
        let mut bundle = CreativeBundle::default();
        bundle
            .channel_copy
            .insert("whatsapp_broadcast_copy".into(), "Forward to friends".into());
        assert_eq!(bundle.copy_for("WhatsApp Broadcast"), Some("Forward to friends"));
        assert_eq!(bundle.copy_for("Radio"), None);
    }
}
