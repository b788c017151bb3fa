//! LLM client with backend fallback.
//!
//! Uses the RIG framework for the cloud providers and llama.cpp for local
//! GGUF models. The backend is chosen once at startup: local model when
//! configured and present, otherwise Gemini, otherwise OpenAI.

use std::sync::Arc;

use anyhow::{Context, Result};
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::Chat;
use rig::providers::{gemini, openai};
use tracing::{debug, info, warn};

use super::local::GgufModel;
use crate::config::AppConfig;

/// Gemini model used for fast contextual responses.
const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// OpenAI fallback model.
const OPENAI_MODEL: &str = "gpt-4o-mini";

type GeminiAgent = Agent<<gemini::Client as CompletionClient>::CompletionModel>;
type OpenAiAgent = Agent<<openai::Client as CompletionClient>::CompletionModel>;

enum Backend {
    Local(Arc<GgufModel>),
    Gemini(GeminiAgent),
    OpenAi(OpenAiAgent),
}

/// LLM client for generating responses.
pub struct LlmClient {
    backend: Backend,
    max_tokens: u32,
}

impl LlmClient {
    /// Create a client, picking the first available backend.
    ///
    /// Order: local GGUF (when `llm.use_local` and a model file exists),
    /// then Gemini, then OpenAI.
    ///
    /// # Errors
    /// Returns an error when no backend can be initialized.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let max_tokens = config.llm.max_tokens;
        let temperature = config.llm.temperature;

        if config.llm.use_local {
            match config.find_gguf_model() {
                Some(path) => {
                    info!("🧠 Loading local model: {}", path.display());
                    match GgufModel::load(&path, temperature) {
                        Ok(model) => {
                            return Ok(Self { backend: Backend::Local(Arc::new(model)), max_tokens });
                        }
                        Err(e) => {
                            warn!("Failed to load local model, trying cloud backends: {:#}", e);
                        }
                    }
                }
                None => {
                    info!("No GGUF model in {}, trying cloud backends", config.model_dir.display());
                }
            }
        }

        if let Some(api_key) = env_key("GEMINI_API_KEY") {
            let client = gemini::Client::builder().api_key(&api_key).build().context("Failed to create Gemini client")?;

            let agent = client.agent(GEMINI_MODEL).temperature(temperature as f64).max_tokens(max_tokens as u64).build();

            info!("✅ Gemini client initialized ({})", GEMINI_MODEL);
            return Ok(Self { backend: Backend::Gemini(agent), max_tokens });
        }

        if let Some(api_key) = env_key("OPENAI_API_KEY") {
            let client = openai::Client::builder().api_key(&api_key).build().context("Failed to create OpenAI client")?;

            let agent = client.agent(OPENAI_MODEL).temperature(temperature as f64).max_tokens(max_tokens as u64).build();

            info!("✅ OpenAI client initialized ({})", OPENAI_MODEL);
            return Ok(Self { backend: Backend::OpenAi(agent), max_tokens });
        }

        anyhow::bail!(
            "No LLM backend available: place a .gguf model in {} or set GEMINI_API_KEY / OPENAI_API_KEY",
            config.model_dir.display()
        )
    }

    /// Name of the active backend, for logging and the self-test.
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Local(_) => "local",
            Backend::Gemini(_) => "gemini",
            Backend::OpenAi(_) => "openai",
        }
    }

    /// Generate a response for a fully assembled prompt.
    ///
    /// Each prompt is self-contained (the prompt builder bakes in all
    /// context), so no conversation history is kept.
    ///
    /// # Errors
    /// Returns an error if generation fails on the active backend.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Prompt: {} chars", prompt.len());

        let response = match &self.backend {
            Backend::Local(model) => {
                let model = model.clone();
                let prompt = prompt.to_string();
                let max_tokens = self.max_tokens as usize;
                tokio::task::spawn_blocking(move || model.generate(&prompt, max_tokens)).await.context("Local inference task panicked")??
            }
            Backend::Gemini(agent) => agent.chat(prompt, vec![]).await.context("Gemini request failed")?,
            Backend::OpenAi(agent) => agent.chat(prompt, vec![]).await.context("OpenAI request failed")?,
        };

        debug!("Assistant: {}", response);
        Ok(response.trim().to_string())
    }
}

/// Read a non-empty environment variable.
fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
