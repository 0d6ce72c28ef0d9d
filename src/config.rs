//! Planner configuration.
//!
//! Loaded from an optional TOML file, then overridden from the environment.
//! Every field has a default, so an empty file (or no file) is a valid config.
//! Provider credentials are not part of the file: the gateway and search
//! adapters read them from `OPENROUTER_*` / `SERPER_*` variables themselves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Budget used when a request carries no budget fields.
pub const DEFAULT_BUDGET: u64 = 5000;

/// Below this budget a single high-impact channel is acceptable even when the
/// request asks for both online and offline channels.
pub const LOW_BUDGET_THRESHOLD: u64 = 3000;

const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Which split feeds the final plan's per-channel budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetSource {
    /// The strategy step's split after exact-sum correction.
    #[default]
    Strategy,
    /// The deterministic allocator's split.
    Allocator,
}

/// Which entity recognizer backs the extraction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityBackend {
    #[default]
    Lexicon,
    Llm,
}

/// Model and sampling settings for one generative step.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl GenerationSettings {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            model: default_model(),
            temperature,
            max_tokens: None,
        }
    }
}

/// Per-step generation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StepModels {
    pub entities: GenerationSettings,
    pub trends: GenerationSettings,
    pub context: GenerationSettings,
    pub persona: GenerationSettings,
    pub strategy: GenerationSettings,
    pub creative: GenerationSettings,
    pub visuals: GenerationSettings,
}

impl Default for StepModels {
    fn default() -> Self {
        Self {
            entities: GenerationSettings::with_temperature(0.0),
            trends: GenerationSettings::with_temperature(0.3),
            context: GenerationSettings::with_temperature(0.0),
            persona: GenerationSettings::with_temperature(0.7),
            strategy: GenerationSettings::with_temperature(0.3),
            creative: GenerationSettings::with_temperature(0.8),
            visuals: GenerationSettings::with_temperature(0.7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Country hint sent with every query.
    pub country: String,
    /// Language hint sent with every query.
    pub language: String,
    /// Organic results kept per query.
    pub max_organic: usize,
    pub timeout_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            country: "in".into(),
            language: "en".into(),
            max_organic: 3,
            timeout_seconds: 10,
        }
    }
}

/// Extra lexicon entries for the offline entity recognizer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LexiconExtensions {
    pub events: Vec<String>,
    pub locations: Vec<String>,
    pub products: Vec<String>,
    pub audience_groups: Vec<String>,
    pub orgs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub default_budget: u64,
    pub low_budget_threshold: u64,
    pub budget_source: BudgetSource,
    pub entity_backend: EntityBackend,
    pub models: StepModels,
    pub search: SearchSettings,
    pub lexicon: LexiconExtensions,
    /// Extra history summaries keyed by user id, layered over the built-in mock.
    pub history: BTreeMap<String, String>,
    pub server: ServerSettings,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_budget: DEFAULT_BUDGET,
            low_budget_threshold: LOW_BUDGET_THRESHOLD,
            budget_source: BudgetSource::default(),
            entity_backend: EntityBackend::default(),
            models: StepModels::default(),
            search: SearchSettings::default(),
            lexicon: LexiconExtensions::default(),
            history: BTreeMap::new(),
            server: ServerSettings::default(),
        }
    }
}

impl PlannerConfig {
    /// Load from `path`, falling back to `CAMPAIGN_CONFIG`, then to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var("CAMPAIGN_CONFIG").ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e: toml::de::Error| e.to_string())
    }

    fn apply_env(&mut self) {
        if let Ok(bind) = std::env::var("CAMPAIGN_BIND") {
            self.server.bind = bind;
        }
    }
}
