//! Entity extraction from the free-text campaign goal.
//!
//! Recognition itself is a collaborator ([`EntityRecognizer`]); this module owns
//! the routing of tagged entities and noun tokens into keyword categories.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationSettings;
use crate::gateway::{Attribution, ChatGateway};
use crate::generation::generate_structured;
use crate::prompts::ENTITY_ANNOTATION;
use crate::steps::PipelineStep;

use super::StepContext;

// =============================================================================
// Recognizer boundary
// =============================================================================

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("recognizer failed: {0}")]
    Failed(String),
}

/// A named entity with its tag (`GPE`, `EVENT`, `DATE`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub text: String,
    pub label: String,
}

impl NamedEntity {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Coarse part of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartOfSpeech {
    Noun,
    ProperNoun,
    Other,
}

impl PartOfSpeech {
    pub fn is_noun(&self) -> bool {
        matches!(self, Self::Noun | Self::ProperNoun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub is_stop: bool,
    /// Part of a named entity span.
    pub in_entity: bool,
}

/// Recognizer output for one text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub entities: Vec<NamedEntity>,
    pub tokens: Vec<Token>,
}

#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn annotate(&self, text: &str) -> Result<Annotation, RecognizerError>;
}

// =============================================================================
// Bundle
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Locations,
    Events,
    ProductsServices,
    TargetGroups,
    DatesTimes,
    Orgs,
}

impl Category {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "GPE" | "LOC" => Some(Self::Locations),
            "EVENT" => Some(Self::Events),
            "PRODUCT" => Some(Self::ProductsServices),
            "PERSON" | "NORP" => Some(Self::TargetGroups),
            "DATE" | "TIME" => Some(Self::DatesTimes),
            "ORG" => Some(Self::Orgs),
            _ => None,
        }
    }
}

/// Categorized keywords from the goal text. Every list is sorted and
/// duplicate-free, and no text appears in more than one of the first seven.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityBundle {
    pub locations: Vec<String>,
    pub events: Vec<String>,
    pub products_services: Vec<String>,
    pub target_groups: Vec<String>,
    pub dates_times: Vec<String>,
    pub orgs: Vec<String>,
    pub misc_keywords: Vec<String>,
    /// Offer-like tokens in their original case. Not part of the dedup set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_terms: Option<Vec<String>>,
}

impl EntityBundle {
    fn list_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Locations => &mut self.locations,
            Category::Events => &mut self.events,
            Category::ProductsServices => &mut self.products_services,
            Category::TargetGroups => &mut self.target_groups,
            Category::DatesTimes => &mut self.dates_times,
            Category::Orgs => &mut self.orgs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.events.is_empty()
            && self.products_services.is_empty()
            && self.target_groups.is_empty()
            && self.dates_times.is_empty()
            && self.orgs.is_empty()
            && self.misc_keywords.is_empty()
            && self.offer_terms.is_none()
    }

    /// Keywords that drive trend search: products first, then misc.
    pub fn trend_keywords(&self) -> Vec<String> {
        self.products_services
            .iter()
            .chain(self.misc_keywords.iter())
            .cloned()
            .collect()
    }

    pub fn first_event(&self) -> Option<&str> {
        self.events.first().map(String::as_str)
    }

    fn finish(&mut self) {
        for list in [
            &mut self.locations,
            &mut self.events,
            &mut self.products_services,
            &mut self.target_groups,
            &mut self.dates_times,
            &mut self.orgs,
            &mut self.misc_keywords,
        ] {
            list.sort();
            list.dedup();
        }
        if let Some(offers) = self.offer_terms.as_mut() {
            offers.sort();
            offers.dedup();
        }
    }
}

fn is_offer_like(keyword: &str, original: &str) -> bool {
    ["discount", "sale", "offer"]
        .iter()
        .any(|term| keyword.contains(term))
        || original.contains('%')
}

/// Route an annotation into categories.
///
/// Entities are routed by tag, first occurrence wins. Non-entity noun tokens
/// that are not stop words are added to `misc_keywords` by lowercased lemma
/// unless that text was already claimed.
pub fn categorize(annotation: &Annotation) -> EntityBundle {
    let mut bundle = EntityBundle::default();
    let mut seen: HashSet<String> = HashSet::new();

    for entity in &annotation.entities {
        let text = entity.text.trim().to_lowercase();
        if text.is_empty() || seen.contains(&text) {
            continue;
        }
        seen.insert(text.clone());
        if let Some(category) = Category::from_label(&entity.label) {
            bundle.list_mut(category).push(text);
        }
    }

    for token in &annotation.tokens {
        if !token.pos.is_noun() || token.is_stop || token.in_entity {
            continue;
        }
        let keyword = token.lemma.trim().to_lowercase();
        if keyword.is_empty() || seen.contains(&keyword) {
            continue;
        }
        seen.insert(keyword.clone());
        if is_offer_like(&keyword, &token.text) {
            bundle
                .offer_terms
                .get_or_insert_with(Vec::new)
                .push(token.text.clone());
        }
        bundle.misc_keywords.push(keyword);
    }

    bundle.finish();
    bundle
}

/// Result of the extraction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityExtraction {
    Extracted(EntityBundle),
    Unavailable { error: String },
}

impl EntityExtraction {
    pub fn bundle(&self) -> Option<&EntityBundle> {
        match self {
            Self::Extracted(bundle) => Some(bundle),
            Self::Unavailable { .. } => None,
        }
    }
}

pub async fn extract_entities(ctx: StepContext<'_>, goal: &str) -> EntityExtraction {
    let Some(recognizer) = ctx.services.entities.get() else {
        let reason = ctx.services.entities.unavailable_reason().unwrap_or("unknown");
        tracing::warn!(step = %PipelineStep::EntityExtractor, %reason, "skipping entity extraction");
        return EntityExtraction::Unavailable {
            error: format!("entity recognizer not available: {reason}"),
        };
    };

    if goal.trim().is_empty() {
        tracing::warn!("empty goal description");
        return EntityExtraction::Extracted(EntityBundle::default());
    }

    match recognizer.annotate(goal).await {
        Ok(annotation) => {
            let bundle = categorize(&annotation);
            tracing::debug!(
                events = ?bundle.events,
                misc = ?bundle.misc_keywords,
                "entities extracted"
            );
            EntityExtraction::Extracted(bundle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "entity recognition failed");
            EntityExtraction::Unavailable {
                error: e.to_string(),
            }
        }
    }
}

// =============================================================================
// Generative recognizer
// =============================================================================

#[derive(Debug, Deserialize)]
struct LlmAnnotation {
    #[serde(default)]
    entities: Vec<NamedEntity>,
    #[serde(default)]
    nouns: Vec<LlmNoun>,
}

#[derive(Debug, Deserialize)]
struct LlmNoun {
    text: String,
    #[serde(default)]
    lemma: Option<String>,
    #[serde(default)]
    proper: bool,
}

/// Recognizer backed by the chat gateway.
pub struct LlmEntityRecognizer {
    gateway: Arc<dyn ChatGateway>,
    settings: GenerationSettings,
}

impl LlmEntityRecognizer {
    pub fn new(gateway: Arc<dyn ChatGateway>, settings: GenerationSettings) -> Self {
        Self { gateway, settings }
    }
}

#[async_trait]
impl EntityRecognizer for LlmEntityRecognizer {
    async fn annotate(&self, text: &str) -> Result<Annotation, RecognizerError> {
        let prompt = ENTITY_ANNOTATION.render(&[("text", text)]);
        let raw: LlmAnnotation = generate_structured(
            self.gateway.as_ref(),
            &self.settings,
            Attribution::new(PipelineStep::EntityExtractor.caller()),
            &prompt,
            PipelineStep::EntityExtractor,
            |_| Ok(()),
        )
        .await
        .map_err(|f| RecognizerError::Failed(f.message))?;

        let tokens = raw
            .nouns
            .into_iter()
            .map(|noun| Token {
                lemma: noun.lemma.unwrap_or_else(|| noun.text.clone()),
                text: noun.text,
                pos: if noun.proper {
                    PartOfSpeech::ProperNoun
                } else {
                    PartOfSpeech::Noun
                },
                is_stop: false,
                in_entity: false,
            })
            .collect();

        Ok(Annotation {
            entities: raw.entities,
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noun(text: &str, lemma: &str) -> Token {
        Token {
            text: text.into(),
            lemma: lemma.into(),
            pos: PartOfSpeech::Noun,
            is_stop: false,
            in_entity: false,
        }
    }

    #[test]
    fn routes_by_tag_and_drops_unmapped() {
        let annotation = Annotation {
            entities: vec![
                NamedEntity::new("Pune", "GPE"),
                NamedEntity::new("Diwali", "EVENT"),
                NamedEntity::new("this weekend", "DATE"),
                NamedEntity::new("Marathi", "NORP"),
                NamedEntity::new("500 rupees", "MONEY"),
            ],
            tokens: vec![],
        };
        let b = categorize(&annotation);
        assert_eq!(b.locations, vec!["pune"]);
        assert_eq!(b.events, vec!["diwali"]);
        assert_eq!(b.dates_times, vec!["this weekend"]);
        assert_eq!(b.target_groups, vec!["marathi"]);
        assert!(b.misc_keywords.is_empty());
        assert!(b.offer_terms.is_none());
    }

    #[test]
    fn first_assignment_wins_across_categories() {
        let annotation = Annotation {
            entities: vec![
                NamedEntity::new("Diwali", "EVENT"),
                NamedEntity::new("diwali", "DATE"),
            ],
            tokens: vec![noun("Diwali", "Diwali"), noun("coffee", "coffee")],
        };
        let b = categorize(&annotation);
        assert_eq!(b.events, vec!["diwali"]);
        assert!(b.dates_times.is_empty());
        assert_eq!(b.misc_keywords, vec!["coffee"]);
    }

    #[test]
    fn offer_terms_keep_original_case() {
        let annotation = Annotation {
            entities: vec![],
            tokens: vec![
                noun("Sales", "sale"),
                noun("20%", "20%"),
                noun("Discount", "discount"),
                noun("sales", "sale"),
                noun("cafe", "cafe"),
            ],
        };
        let b = categorize(&annotation);
        assert_eq!(b.misc_keywords, vec!["20%", "cafe", "discount", "sale"]);
        assert_eq!(
            b.offer_terms,
            Some(vec!["20%".to_string(), "Discount".into(), "Sales".into()])
        );
    }

    #[test]
    fn stop_words_non_nouns_and_entity_tokens_are_skipped() {
        let mut stop = noun("the", "the");
        stop.is_stop = true;
        let mut verb = noun("boost", "boost");
        verb.pos = PartOfSpeech::Other;
        let mut inside = noun("chaturthi", "chaturthi");
        inside.in_entity = true;
        let b = categorize(&Annotation {
            entities: vec![],
            tokens: vec![stop, verb, inside],
        });
        assert!(b.is_empty());
    }

    #[test]
    fn trend_keywords_put_products_first() {
        let b = EntityBundle {
            products_services: vec!["cold brew".into()],
            misc_keywords: vec!["discount".into(), "sale".into()],
            ..Default::default()
        };
        assert_eq!(b.trend_keywords(), vec!["cold brew", "discount", "sale"]);
    }

    #[test]
    fn unavailable_serializes_as_error_object() {
        let e = EntityExtraction::Unavailable {
            error: "model missing".into(),
        };
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            serde_json::json!({"error": "model missing"})
        );
    }
}
