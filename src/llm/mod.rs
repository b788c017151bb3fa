//! Language model backends.
//!
//! One client, three backends: a local GGUF model via llama.cpp, Google
//! Gemini, and OpenAI (both through rig). Selection happens once at
//! startup: local first when configured and a model file exists, then
//! Gemini, then OpenAI.

mod client;
mod local;

pub use client::LlmClient;

use thiserror::Error;

/// Errors from local model loading and inference.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model not available: {0}")]
    ModelNotAvailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}
