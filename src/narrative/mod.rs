//! Narrative text for civilizations and events
//!
//! A `NarrativeSource` turns a request into prose. `Chronicler` wraps an
//! optional backing source and falls back to `TemplateNarrator`, so callers
//! always get plain text and never see a service failure.

pub mod client;
pub mod context;
pub mod templates;

pub use client::LlmClient;
pub use context::{NameBook, NarrativeRequest};
pub use templates::TemplateNarrator;

use std::future::Future;

use tracing::warn;

use crate::core::error::Result;

/// Anything that can write prose for a request
pub trait NarrativeSource {
    fn generate(&self, request: &NarrativeRequest) -> impl Future<Output = Result<String>> + Send;
}

pub struct Chronicler<S> {
    source: Option<S>,
    fallback: TemplateNarrator,
}

impl<S: NarrativeSource + Sync> Chronicler<S> {
    pub fn new(source: S) -> Self {
        Self { source: Some(source), fallback: TemplateNarrator::new() }
    }

    /// Use `source` when present, templates otherwise
    pub fn with_optional(source: Option<S>) -> Self {
        Self { source, fallback: TemplateNarrator::new() }
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub async fn narrate(&self, request: &NarrativeRequest) -> String {
        if let Some(source) = &self.source {
            match source.generate(request).await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => warn!(subject = %request.subject_key(), "empty narrative, using template"),
                Err(e) => warn!(subject = %request.subject_key(), error = %e, "narrative source failed, using template"),
            }
        }
        self.fallback.render(request)
    }
}

impl Chronicler<TemplateNarrator> {
    pub fn templates_only() -> Self {
        Self { source: None, fallback: TemplateNarrator::new() }
    }
}
