//! Clothing recommendations generated by a language model
//!
//! The model is loaded lazily on the first recommendation and kept for the
//! lifetime of the process. The mutex around the backend is also the
//! one-time-init barrier: concurrent first calls wait for a single load.

pub mod backend;
pub mod prompt;
pub mod qwen;

use crate::config::ModelConfig;
use crate::models::DayForecast;
use crate::{OutfitError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, instrument};

pub use backend::{BackendLoader, GenerationParams, TextGenerator};
pub use qwen::QwenGenerator;

static GLOBAL_ENGINE: OnceLock<RecommendationEngine> = OnceLock::new();

/// Anything that turns one day of weather into clothing advice
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, day: &DayForecast) -> Result<String>;
}

struct EngineState {
    loader: BackendLoader,
    params: GenerationParams,
    backend: Mutex<Option<Box<dyn TextGenerator>>>,
}

/// Prompt construction plus a lazily loaded text generation backend
#[derive(Clone)]
pub struct RecommendationEngine {
    state: Arc<EngineState>,
}

impl RecommendationEngine {
    pub fn new(loader: BackendLoader, params: GenerationParams) -> Self {
        Self {
            state: Arc::new(EngineState {
                loader,
                params,
                backend: Mutex::new(None),
            }),
        }
    }

    /// Engine backed by the configured Qwen model
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        let model_config = config.clone();
        let loader: BackendLoader = Box::new(move || {
            QwenGenerator::load(&model_config).map(|g| Box::new(g) as Box<dyn TextGenerator>)
        });
        Self::new(loader, GenerationParams::from(config))
    }

    /// Process-wide engine; the configuration of the first caller wins
    #[must_use]
    pub fn global(config: &ModelConfig) -> Self {
        GLOBAL_ENGINE
            .get_or_init(|| Self::from_config(config))
            .clone()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.backend.lock().is_some()
    }

    /// Drop the loaded backend; the next recommendation loads it again
    pub fn reset(&self) {
        *self.state.backend.lock() = None;
    }

    /// Generate a recommendation, blocking until the model is done
    #[instrument(skip(self))]
    pub fn recommend_blocking(
        &self,
        min_temp_c: f64,
        max_temp_c: f64,
        condition: &str,
    ) -> Result<String> {
        let prompt = prompt::build_prompt(min_temp_c, max_temp_c, condition);

        let mut guard = self.state.backend.lock();
        if guard.is_none() {
            info!("Loading text generation backend");
            let start_time = Instant::now();
            let loaded = (self.state.loader)()?;
            info!(
                "Backend ready ({}) in {:.1}s",
                loaded.describe(),
                start_time.elapsed().as_secs_f64()
            );
            *guard = Some(loaded);
        }
        let Some(backend) = guard.as_mut() else {
            return Err(OutfitError::inference("backend unavailable after loading"));
        };

        let input = backend.encode(&prompt)?;
        let output = backend.generate(&input, &self.state.params)?;

        // the backend echoes the prompt; keep only what follows it
        let continuation = output.get(input.len()..).ok_or_else(|| {
            OutfitError::inference(format!(
                "generation returned {} tokens for a {} token prompt",
                output.len(),
                input.len()
            ))
        })?;

        let text = backend.decode(continuation)?;
        debug!("Recommendation has {} characters", text.len());
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Recommender for RecommendationEngine {
    async fn recommend(&self, day: &DayForecast) -> Result<String> {
        let engine = self.clone();
        let (min, max, condition) = (day.min_temp_c, day.max_temp_c, day.condition.clone());
        tokio::task::spawn_blocking(move || engine.recommend_blocking(min, max, &condition)).await?
    }
}
