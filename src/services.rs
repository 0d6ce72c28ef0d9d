//! Process-wide collaborator handles.
//!
//! Clients are built once at startup and shared read-only across requests. A
//! client that could not be built is carried as [`Collaborator::Unavailable`]
//! with its reason, and each step decides how to degrade when it meets one.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{EntityBackend, PlannerConfig};
use crate::gateway::{ChatGateway, ProviderGateway, TracingUsageSink};
use crate::search::{SerperAdapter, WebSearch};
use crate::steps::entities::{EntityRecognizer, LlmEntityRecognizer};
use crate::steps::history::{HistoryStore, MockHistoryStore};
use crate::steps::lexicon::LexiconRecognizer;

/// A collaborator that either initialized or did not.
pub enum Collaborator<T: ?Sized> {
    Ready(Arc<T>),
    Unavailable(String),
}

impl<T: ?Sized> Collaborator<T> {
    pub fn ready(inner: Arc<T>) -> Self {
        Self::Ready(inner)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Turn a construction result into a collaborator, keeping the error text.
    pub fn from_result<E: std::fmt::Display>(result: Result<Arc<T>, E>) -> Self {
        match result {
            Ok(inner) => Self::Ready(inner),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Ready(inner) => Some(inner.as_ref()),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Unavailable(reason) => Some(reason),
        }
    }
}

impl<T: ?Sized> Clone for Collaborator<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(inner) => Self::Ready(Arc::clone(inner)),
            Self::Unavailable(reason) => Self::Unavailable(reason.clone()),
        }
    }
}

/// Everything the pipeline talks to outside its own process.
#[derive(Clone)]
pub struct Services {
    pub chat: Collaborator<dyn ChatGateway>,
    pub search: Collaborator<dyn WebSearch>,
    pub entities: Collaborator<dyn EntityRecognizer>,
    pub history: Arc<dyn HistoryStore>,
}

impl Services {
    /// Build every collaborator from `config` and the provider environment
    /// variables. Missing credentials leave that collaborator unavailable.
    pub fn from_config(config: &PlannerConfig) -> Self {
        let chat: Collaborator<dyn ChatGateway> = Collaborator::from_result(
            ProviderGateway::from_env(Arc::new(TracingUsageSink))
                .map(|gateway| Arc::new(gateway) as Arc<dyn ChatGateway>),
        );

        let search: Collaborator<dyn WebSearch> = Collaborator::from_result(
            SerperAdapter::from_env(
                Duration::from_secs(config.search.timeout_seconds),
                config.search.max_organic,
            )
            .map(|adapter| Arc::new(adapter) as Arc<dyn WebSearch>),
        );

        let entities: Collaborator<dyn EntityRecognizer> = match (config.entity_backend, &chat) {
            (EntityBackend::Lexicon, _) => {
                Collaborator::ready(
                    Arc::new(LexiconRecognizer::new(&config.lexicon)) as Arc<dyn EntityRecognizer>
                )
            }
            (EntityBackend::Llm, Collaborator::Ready(gateway)) => {
                let recognizer =
                    LlmEntityRecognizer::new(Arc::clone(gateway), config.models.entities.clone());
                Collaborator::ready(Arc::new(recognizer) as Arc<dyn EntityRecognizer>)
            }
            (EntityBackend::Llm, Collaborator::Unavailable(reason)) => {
                Collaborator::unavailable(format!("entity model needs the chat gateway: {reason}"))
            }
        };

        Self {
            chat,
            search,
            entities,
            history: Arc::new(MockHistoryStore::with_entries(&config.history)),
        }
    }

    /// Log which collaborators came up. Called once at startup.
    pub fn log_status(&self) {
        let entries = [
            ("chat", self.chat.unavailable_reason()),
            ("search", self.search.unavailable_reason()),
            ("entities", self.entities.unavailable_reason()),
        ];
        for (name, reason) in entries {
            match reason {
                None => tracing::info!(collaborator = name, "collaborator ready"),
                Some(reason) => {
                    tracing::warn!(collaborator = name, %reason, "collaborator unavailable")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_result_keeps_error_text() {
        let c: Collaborator<str> = Collaborator::from_result::<&str>(Err("no key"));
        assert!(!c.is_ready());
        assert_eq!(c.unavailable_reason(), Some("no key"));
        assert!(c.get().is_none());

        let c: Collaborator<str> = Collaborator::from_result::<&str>(Ok(Arc::from("x")));
        assert_eq!(c.get(), Some("x"));
    }
}
