//! Seam between the recommendation engine and a concrete language model

use crate::Result;
use crate::config::ModelConfig;

/// Sampling settings for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub repetition_penalty: f32,
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for GenerationParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            repetition_penalty: config.repetition_penalty,
            seed: config.seed,
        }
    }
}

/// A loaded tokenizer + causal language model.
///
/// `generate` returns the prompt tokens followed by the continuation, the same
/// shape a causal model's generate call produces.
pub trait TextGenerator: Send {
    fn encode(&mut self, text: &str) -> Result<Vec<u32>>;

    fn generate(&mut self, prompt: &[u32], params: &GenerationParams) -> Result<Vec<u32>>;

    /// Decode tokens, skipping special tokens
    fn decode(&mut self, tokens: &[u32]) -> Result<String>;

    /// Short description for logs, e.g. "cuda f16"
    fn describe(&self) -> String;
}

/// Produces a backend on first use
pub type BackendLoader = Box<dyn Fn() -> Result<Box<dyn TextGenerator>> + Send + Sync>;
