//! Qwen2 instruct model running on candle
//!
//! Weights come from the Hugging Face hub (or a local directory). Loading tries
//! an accelerator in half precision first and falls back to the CPU in f32.

use super::backend::{GenerationParams, TextGenerator};
use crate::config::ModelConfig;
use crate::{OutfitError, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::qwen2::{Config as QwenConfig, ModelForCausalLM};
use candle_transformers::utils::apply_repeat_penalty;
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{debug, info, instrument, warn};

const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const SINGLE_WEIGHTS_FILE: &str = "model.safetensors";
const WEIGHTS_INDEX_FILE: &str = "model.safetensors.index.json";
const EOS_TOKENS: [&str; 2] = ["<|im_end|>", "<|endoftext|>"];

/// Paths of everything needed to build the model
#[derive(Debug, Clone)]
struct ModelFiles {
    tokenizer: PathBuf,
    config: PathBuf,
    weights: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct WeightsIndex {
    weight_map: HashMap<String, String>,
}

/// Shard file names referenced by a safetensors index, deduplicated and sorted
fn shard_names(index_json: &str) -> Result<Vec<String>> {
    let index: WeightsIndex = serde_json::from_str(index_json)
        .map_err(|e| OutfitError::inference(format!("Invalid weights index: {e}")))?;
    let names: BTreeSet<String> = index.weight_map.into_values().collect();
    Ok(names.into_iter().collect())
}

impl ModelFiles {
    fn resolve(config: &ModelConfig) -> Result<Self> {
        match &config.local_dir {
            Some(dir) => Self::from_dir(Path::new(dir)),
            None => Self::from_hub(&config.model_id, &config.revision),
        }
    }

    fn from_dir(dir: &Path) -> Result<Self> {
        let single = dir.join(SINGLE_WEIGHTS_FILE);
        let weights = if single.exists() {
            vec![single]
        } else {
            let index = std::fs::read_to_string(dir.join(WEIGHTS_INDEX_FILE))?;
            shard_names(&index)?
                .into_iter()
                .map(|name| dir.join(name))
                .collect()
        };

        Ok(Self {
            tokenizer: dir.join(TOKENIZER_FILE),
            config: dir.join(CONFIG_FILE),
            weights,
        })
    }

    fn from_hub(model_id: &str, revision: &str) -> Result<Self> {
        info!("Fetching {} ({}) from the Hugging Face hub", model_id, revision);
        let hub_error = |e: hf_hub::api::sync::ApiError| {
            OutfitError::inference(format!("Failed to download {model_id}: {e}"))
        };

        let api = Api::new().map_err(hub_error)?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let weights = match repo.get(SINGLE_WEIGHTS_FILE) {
            Ok(path) => vec![path],
            Err(e) => {
                debug!("No single weights file ({}), trying the shard index", e);
                let index_path = repo.get(WEIGHTS_INDEX_FILE).map_err(hub_error)?;
                let index = std::fs::read_to_string(index_path)?;
                shard_names(&index)?
                    .iter()
                    .map(|name| repo.get(name).map_err(hub_error))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        Ok(Self {
            tokenizer: repo.get(TOKENIZER_FILE).map_err(hub_error)?,
            config: repo.get(CONFIG_FILE).map_err(hub_error)?,
            weights,
        })
    }
}

fn accelerator() -> candle_core::Result<Device> {
    if candle_core::utils::cuda_is_available() {
        Device::new_cuda(0)
    } else if candle_core::utils::metal_is_available() {
        Device::new_metal(0)
    } else {
        Err(candle_core::Error::Msg("no accelerator available".to_string()))
    }
}

fn build_model(
    config: &QwenConfig,
    weights: &[PathBuf],
    device: &Device,
    dtype: DType,
) -> candle_core::Result<ModelForCausalLM> {
    let mut tensors = HashMap::new();
    for path in weights {
        tensors.extend(candle_core::safetensors::load(path, device)?);
    }
    let vb = VarBuilder::from_tensors(tensors, dtype, device);
    ModelForCausalLM::new(config, vb)
}

/// Run an accelerated load; any error or panic (e.g. out of memory) yields `None`
fn load_accelerated<T>(load: impl FnOnce() -> candle_core::Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(load)) {
        Ok(Ok(loaded)) => Some(loaded),
        Ok(Err(e)) => {
            warn!("Accelerated model load failed, falling back to CPU f32: {}", e);
            None
        }
        Err(_) => {
            warn!("Accelerated model load panicked, falling back to CPU f32");
            None
        }
    }
}

/// Tokenizer and Qwen2 weights ready for generation
pub struct QwenGenerator {
    model: ModelForCausalLM,
    tokenizer: Tokenizer,
    device: Device,
    dtype: DType,
    eos_tokens: Vec<u32>,
}

impl QwenGenerator {
    /// Load tokenizer and weights as described by the model configuration
    #[instrument(skip(config), fields(model_id = %config.model_id))]
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let files = ModelFiles::resolve(config)?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| OutfitError::inference(format!("Failed to load tokenizer: {e}")))?;

        let model_config: QwenConfig = serde_json::from_slice(&std::fs::read(&files.config)?)
            .map_err(|e| OutfitError::inference(format!("Invalid model config: {e}")))?;

        let accelerated = if config.prefer_gpu {
            load_accelerated(|| {
                let device = accelerator()?;
                let model = build_model(&model_config, &files.weights, &device, DType::F16)?;
                Ok((model, device, DType::F16))
            })
        } else {
            None
        };

        let (model, device, dtype) = match accelerated {
            Some(loaded) => loaded,
            None => {
                let device = Device::Cpu;
                let model = build_model(&model_config, &files.weights, &device, DType::F32)?;
                (model, device, DType::F32)
            }
        };

        let eos_tokens: Vec<u32> = EOS_TOKENS
            .iter()
            .filter_map(|token| tokenizer.token_to_id(token))
            .collect();
        if eos_tokens.is_empty() {
            warn!("Tokenizer has no end-of-sequence token, generation stops at the token cap");
        }

        let generator = Self {
            model,
            tokenizer,
            device,
            dtype,
            eos_tokens,
        };
        info!("Model loaded on {}", generator.describe());
        Ok(generator)
    }
}

impl TextGenerator for QwenGenerator {
    fn encode(&mut self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| OutfitError::inference(format!("Tokenization failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    #[instrument(skip_all, fields(prompt_tokens = prompt.len()))]
    fn generate(&mut self, prompt: &[u32], params: &GenerationParams) -> Result<Vec<u32>> {
        let seed = params.seed.unwrap_or_else(rand::random);
        let mut logits_processor = LogitsProcessor::from_sampling(
            seed,
            Sampling::TopP {
                p: params.top_p,
                temperature: params.temperature,
            },
        );

        self.model.clear_kv_cache();
        let mut tokens = prompt.to_vec();

        for index in 0..params.max_new_tokens {
            // full prompt on the first step, then one token at a time via the kv cache
            let context_size = if index > 0 { 1 } else { tokens.len() };
            let start_pos = tokens.len().saturating_sub(context_size);
            let input = Tensor::new(&tokens[start_pos..], &self.device)?.unsqueeze(0)?;

            let logits = self.model.forward(&input, start_pos)?;
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;
            let logits = if params.repetition_penalty == 1.0 {
                logits
            } else {
                apply_repeat_penalty(&logits, params.repetition_penalty, &tokens)?
            };

            let next_token = logits_processor.sample(&logits)?;
            tokens.push(next_token);
            if self.eos_tokens.contains(&next_token) {
                break;
            }
        }

        debug!("Generated {} tokens", tokens.len() - prompt.len());
        Ok(tokens)
    }

    fn decode(&mut self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| OutfitError::inference(format!("Detokenization failed: {e}")))
    }

    fn describe(&self) -> String {
        let device = if self.device.is_cuda() {
            "cuda"
        } else if self.device.is_metal() {
            "metal"
        } else {
            "cpu"
        };
        format!("{device} {:?}", self.dtype).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_names_are_unique_and_sorted() {
        let index = r#"{
            "metadata": {"total_size": 1},
            "weight_map": {
                "lm_head.weight": "model-00002-of-00002.safetensors",
                "model.embed_tokens.weight": "model-00001-of-00002.safetensors",
                "model.norm.weight": "model-00002-of-00002.safetensors"
            }
        }"#;
        assert_eq!(
            shard_names(index).unwrap(),
            vec![
                "model-00001-of-00002.safetensors".to_string(),
                "model-00002-of-00002.safetensors".to_string()
            ]
        );
    }

    #[test]
    fn test_local_dir_without_weights_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelFiles::from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_local_dir_prefers_single_weights_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SINGLE_WEIGHTS_FILE), b"").unwrap();
        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert_eq!(files.weights, vec![dir.path().join(SINGLE_WEIGHTS_FILE)]);
        assert_eq!(files.tokenizer, dir.path().join(TOKENIZER_FILE));
    }

    #[test]
    fn test_accelerated_load_error_falls_back() {
        let loaded: Option<u32> = load_accelerated(|| {
            Err(candle_core::Error::Msg("CUDA_ERROR_OUT_OF_MEMORY".to_string()))
        });
        assert!(loaded.is_none());
    }

    #[test]
    fn test_accelerated_load_panic_falls_back() {
        let loaded: Option<u32> = load_accelerated(|| panic!("driver crashed while allocating"));
        assert!(loaded.is_none());
    }

    #[test]
    fn test_accelerated_load_success_is_kept() {
        assert_eq!(load_accelerated(|| Ok(7_u32)), Some(7));
    }

    #[test]
    fn test_cpu_is_never_an_accelerator_without_features() {
        if !candle_core::utils::cuda_is_available() && !candle_core::utils::metal_is_available() {
            assert!(accelerator().is_err());
        }
    }
}
