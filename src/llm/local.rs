//! Local GGUF inference via llama.cpp.
//!
//! Loads a quantized model from the models directory and generates
//! completions on the CPU. Inference is synchronous and slow; callers on
//! the async executor go through `spawn_blocking`.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Instant;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use tracing::{debug, info};

use super::LlmError;

/// Context window for generation.
const CONTEXT_SIZE: u32 = 2048;

/// Local GGUF model runner.
pub struct GgufModel {
    backend: LlamaBackend,
    model: LlamaModel,
    temperature: f32,
}

// Safety: LlamaBackend and LlamaModel are thread-safe once initialized
unsafe impl Send for GgufModel {}
unsafe impl Sync for GgufModel {}

impl GgufModel {
    /// Load a GGUF model from disk.
    ///
    /// # Errors
    /// Returns [`LlmError::ModelNotAvailable`] when the file is missing and
    /// [`LlmError::Inference`] when llama.cpp rejects it.
    pub fn load(model_path: &Path, temperature: f32) -> Result<Self, LlmError> {
        if !model_path.exists() {
            return Err(LlmError::ModelNotAvailable(format!("GGUF model not found: {}", model_path.display())));
        }

        let backend = LlamaBackend::init().map_err(|e| LlmError::Inference(format!("Failed to initialize llama backend: {:?}", e)))?;

        // CPU-only loading; the assistant shares the machine with STT and OCR
        let model_params = LlamaModelParams::default();

        let model =
            LlamaModel::load_from_file(&backend, model_path, &model_params).map_err(|e| LlmError::Inference(format!("Failed to load GGUF model: {:?}", e)))?;

        info!("Loaded GGUF model from {} (CPU mode)", model_path.display());

        Ok(Self { backend, model, temperature })
    }

    /// Generate a completion for the prompt.
    ///
    /// The prompt is wrapped in ChatML markers, which the common instruct
    /// quantizations all understand.
    ///
    /// # Errors
    /// Returns [`LlmError::Inference`] on tokenization or decode failures.
    pub fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String, LlmError> {
        let wrapped = format!("<|im_start|>user\n{}<|im_end|>\n<|im_start|>assistant\n", prompt);

        let ctx_params = LlamaContextParams::default().with_n_ctx(NonZeroU32::new(CONTEXT_SIZE));

        let mut ctx = self.model.new_context(&self.backend, ctx_params).map_err(|e| LlmError::Inference(format!("Failed to create context: {:?}", e)))?;

        let start = Instant::now();
        let tokens = self.model.str_to_token(&wrapped, AddBos::Always).map_err(|e| LlmError::Inference(format!("Failed to tokenize: {:?}", e)))?;

        if tokens.len() as u32 >= CONTEXT_SIZE {
            return Err(LlmError::Inference(format!("prompt too long: {} tokens for a {} token context", tokens.len(), CONTEXT_SIZE)));
        }

        let mut batch = LlamaBatch::new(CONTEXT_SIZE as usize, 1);
        let last_index = tokens.len() - 1;
        for (i, token) in tokens.iter().enumerate() {
            batch.add(*token, i as i32, &[0], i == last_index).map_err(|e| LlmError::Inference(format!("Failed to add token to batch: {:?}", e)))?;
        }

        // Prefill
        ctx.decode(&mut batch).map_err(|e| LlmError::Inference(format!("Failed to decode prompt: {:?}", e)))?;

        debug!("Prefill ({} tokens): {:?}", tokens.len(), start.elapsed());

        let mut sampler = LlamaSampler::chain_simple([LlamaSampler::temp(self.temperature), LlamaSampler::top_p(0.9, 1), LlamaSampler::dist(42)]);

        let decode_start = Instant::now();
        let mut output_tokens = Vec::new();
        let mut n_cur = tokens.len() as i32;

        for _ in 0..max_tokens {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);

            if self.model.is_eog_token(token) {
                break;
            }

            let token_str = self.model.token_to_str(token, Special::Tokenize).unwrap_or_default();
            if token_str.contains("<|im_end|>") || token_str.contains("<|endoftext|>") {
                break;
            }

            output_tokens.push(token);

            batch.clear();
            batch.add(token, n_cur, &[0], true).map_err(|e| LlmError::Inference(format!("Failed to add token: {:?}", e)))?;
            n_cur += 1;

            ctx.decode(&mut batch).map_err(|e| LlmError::Inference(format!("Failed to decode: {:?}", e)))?;
        }

        let mut result = String::new();
        for token in &output_tokens {
            if let Ok(s) = self.model.token_to_str(*token, Special::Tokenize) {
                result.push_str(&s);
            }
        }

        let decode_elapsed = decode_start.elapsed();
        let tokens_per_sec = if decode_elapsed.as_secs_f64() > 0.0 { output_tokens.len() as f64 / decode_elapsed.as_secs_f64() } else { 0.0 };
        debug!("Decode ({} tokens): {:?} ({:.1} tok/s)", output_tokens.len(), decode_elapsed, tokens_per_sec);

        Ok(result.trim().to_string())
    }
}
