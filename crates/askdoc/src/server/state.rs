//! Application state for the Q&A server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::engine::RagEngine;
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    engine: RagEngine,
}

impl AppState {
    /// Create new application state, opening the corpus database
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing engine (embeddings: {}, generation: {})",
            config.embeddings.model,
            config.llm.generate_model
        );

        let engine = RagEngine::new(config.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, engine }),
        })
    }

    /// Get the engine
    pub fn engine(&self) -> &RagEngine {
        &self.inner.engine
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }
}
