//! Structured generation on top of the chat gateway.
//!
//! Generative steps send a rendered prompt plus a schema description and expect
//! JSON back. A failed call and a reply that does not fit the schema are the same
//! thing to the pipeline: a [`StepFailure`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::GenerationSettings;
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::prompts::PromptInstance;
use crate::steps::PipelineStep;

/// Failure of a generative step.
///
/// `raw_output` holds the model's reply when the call succeeded but the reply
/// could not be used, and is `None` when the call itself failed.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{step} failed: {message}")]
pub struct StepFailure {
    pub step: PipelineStep,
    pub message: String,
    pub raw_output: Option<String>,
}

impl StepFailure {
    pub fn new(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            raw_output: None,
        }
    }

    pub fn with_raw(step: PipelineStep, message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            raw_output: Some(raw.into()),
        }
    }

    fn from_provider(step: PipelineStep, err: ProviderError) -> Self {
        Self::new(step, format!("generation call failed ({}): {err}", err.code()))
    }
}

fn build_request(
    settings: &GenerationSettings,
    attribution: Attribution,
    prompt: &PromptInstance,
) -> ChatRequest {
    ChatRequest::new(
        ChatModel::openrouter(&settings.model),
        prompt.to_messages(),
        attribution,
    )
    .temperature(settings.temperature)
    .max_tokens(settings.max_tokens)
}

/// Free-text generation. The reply is trimmed.
pub async fn generate_text(
    gateway: &dyn ChatGateway,
    settings: &GenerationSettings,
    attribution: Attribution,
    prompt: &PromptInstance,
) -> Result<String, ProviderError> {
    let resp = gateway
        .chat(build_request(settings, attribution, prompt))
        .await?;
    Ok(resp.content.trim().to_string())
}

/// JSON generation parsed into `T`, then checked by `check`.
pub async fn generate_structured<T, F>(
    gateway: &dyn ChatGateway,
    settings: &GenerationSettings,
    attribution: Attribution,
    prompt: &PromptInstance,
    step: PipelineStep,
    check: F,
) -> Result<T, StepFailure>
where
    T: DeserializeOwned,
    F: FnOnce(&mut T) -> Result<(), String>,
{
    let req = build_request(settings, attribution, prompt).json();
    let resp = gateway
        .chat(req)
        .await
        .map_err(|e| StepFailure::from_provider(step, e))?;

    let mut value: T = serde_json::from_str(extract_json(&resp.content)).map_err(|e| {
        StepFailure::with_raw(
            step,
            format!("output did not match schema: {e}"),
            resp.content.clone(),
        )
    })?;

    check(&mut value).map_err(|msg| StepFailure::with_raw(step, msg, resp.content.clone()))?;
    Ok(value)
}

/// Render a JSON schema as the `format_instructions` block of a prompt.
pub fn format_instructions(schema: &serde_json::Value) -> String {
    let body = serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());
    format!("The output must be a single JSON object conforming to this JSON schema. Do not wrap it in prose.\n{body}")
}

/// Extract a JSON object from potentially noisy model output.
///
/// Handles:
/// - Pure JSON responses
/// - JSON wrapped in markdown code fences
/// - JSON embedded in prose
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find('{') {
        let remainder = &trimmed[start..];
        if let Some(end) = find_matching_brace(remainder) {
            return &remainder[..end];
        }
    }

    trimmed
}

/// Byte offset just past the brace that closes the first object, ignoring
/// braces inside JSON strings.
fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
