//! Application configuration: `cluely_config.json` plus CLI arguments.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default configuration file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "cluely_config.json";

/// Audio sample rate used for speech recognition.
pub const SAMPLE_RATE: u32 = 16_000;

/// Command line interface for the assistant.
#[derive(Parser, Debug)]
#[command(name = "cluely")]
#[command(author, version, about = "A proactive context-aware desktop assistant", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, short = 'c', default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory containing model files (Whisper bundles and GGUF weights)
    #[arg(long, short = 'd', env = "CLUELY_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands beyond the default assistant loop.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run component self-tests (environment, microphone, screen, parser, LLM)
    Test,
    /// Print the resolved configuration as JSON and exit
    Config,
    /// Download speech models and verify external tools
    Setup,
}

/// Audio capture and transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Length of each listen window in seconds
    pub listen_duration: f32,
    /// Peak amplitude below which a window is discarded as silence
    pub silence_threshold: f32,
    /// Whisper model variant (e.g. "base", "base.en", "small")
    pub model: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { listen_duration: 5.0, silence_threshold: 0.01, model: "base".to_string() }
    }
}

/// Screen capture and OCR settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Seconds between screen captures
    pub capture_interval: u64,
    /// Maximum length of cleaned OCR text handed to the prompt builder
    pub max_text_length: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self { capture_interval: 10, max_text_length: 1500 }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Prefer a local GGUF model when one is present in the models directory
    pub use_local: bool,
    /// Maximum tokens to generate per response
    pub max_tokens: u32,
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { use_local: true, max_tokens: 150, temperature: 0.7 }
    }
}

/// Response presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Seconds before a response card is considered dismissed (0 = sticky)
    pub auto_dismiss_time: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { auto_dismiss_time: 10 }
    }
}

/// Trigger phrases that activate the assistant directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Phrases that always activate the assistant when heard
    pub direct_activation: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self { direct_activation: vec!["hey cluely".to_string(), "cluely".to_string()] }
    }
}

/// Full assistant configuration, loaded from `cluely_config.json`.
///
/// Every section has defaults, so a partial file (or none at all) is valid.
/// When the file is missing it is created with the default values so users
/// have something to edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub vision: VisionConfig,
    pub llm: LlmConfig,
    pub ui: UiConfig,
    pub triggers: TriggerConfig,
    /// Directory containing model files
    pub model_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            vision: VisionConfig::default(),
            llm: LlmConfig::default(),
            ui: UiConfig::default(),
            triggers: TriggerConfig::default(),
            model_dir: default_model_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the given path, creating a default file when
    /// none exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Self = serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.write(path) {
                // Not fatal: run with defaults even if the file cannot be written
                tracing::warn!("Could not create default config file: {:#}", e);
            } else {
                info!("Created default configuration at {}", path.display());
            }
            Ok(config)
        }
    }

    /// Write the configuration to the given path as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply CLI overrides on top of file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref dir) = cli.model_dir {
            self.model_dir = dir.clone();
        }
    }

    /// Directory holding the Whisper ONNX bundle for the configured variant.
    pub fn whisper_dir(&self) -> PathBuf {
        self.model_dir.join(format!("sherpa-onnx-whisper-{}", self.audio.model))
    }

    /// Path to the Whisper encoder model.
    pub fn whisper_encoder_path(&self) -> PathBuf {
        self.whisper_dir().join(format!("{}-encoder.int8.onnx", self.audio.model))
    }

    /// Path to the Whisper decoder model.
    pub fn whisper_decoder_path(&self) -> PathBuf {
        self.whisper_dir().join(format!("{}-decoder.int8.onnx", self.audio.model))
    }

    /// Path to the Whisper tokens file.
    pub fn whisper_tokens_path(&self) -> PathBuf {
        self.whisper_dir().join(format!("{}-tokens.txt", self.audio.model))
    }

    /// Find a local GGUF model in the models directory, if any.
    ///
    /// Returns the first `.gguf` file in lexical order so the choice is
    /// stable across runs.
    pub fn find_gguf_model(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = fs::read_dir(&self.model_dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gguf")))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    /// Returns an error describing the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.audio.listen_duration < 1.0 {
            anyhow::bail!("audio.listen_duration must be at least 1 second");
        }

        if !(0.0..=1.0).contains(&self.audio.silence_threshold) {
            anyhow::bail!("audio.silence_threshold must be between 0.0 and 1.0");
        }

        if self.audio.model.is_empty() {
            anyhow::bail!("audio.model must not be empty");
        }

        if self.vision.capture_interval == 0 {
            anyhow::bail!("vision.capture_interval must be at least 1 second");
        }

        if self.vision.max_text_length == 0 {
            anyhow::bail!("vision.max_text_length must be positive");
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be between 0.0 and 2.0, got {}", self.llm.temperature);
        }

        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be at least 1");
        }

        Ok(())
    }

    /// Check that the Whisper model files are present.
    ///
    /// # Errors
    /// Returns an error naming the first missing file.
    pub fn validate_models(&self) -> Result<()> {
        if !self.model_dir.exists() {
            anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
        }

        let required_files = [self.whisper_encoder_path(), self.whisper_decoder_path(), self.whisper_tokens_path()];

        for path in &required_files {
            if !path.exists() {
                anyhow::bail!("Required model file not found: {}", path.display());
            }
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Model directory: {}", self.model_dir.display());
        info!("  Listen duration: {}s", self.audio.listen_duration);
        info!("  Silence threshold: {}", self.audio.silence_threshold);
        info!("  Whisper model: {}", self.audio.model);
        info!("  Capture interval: {}s", self.vision.capture_interval);
        info!("  Max screen text: {} chars", self.vision.max_text_length);
        info!("  Prefer local LLM: {}", self.llm.use_local);
        info!("  Max tokens: {}", self.llm.max_tokens);
        info!("  Temperature: {}", self.llm.temperature);
        info!("  Auto-dismiss: {}s", self.ui.auto_dismiss_time);
        info!("  Activation phrases: {:?}", self.triggers.direct_activation);
    }
}

/// Default models directory: a local `models/` when present, otherwise
/// `~/.cluely/models`.
fn default_model_dir() -> PathBuf {
    let local = PathBuf::from("models");
    if local.is_dir() {
        return local;
    }
    dirs::home_dir().map(|home| home.join(".cluely").join("models")).unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.audio.listen_duration, 5.0);
        assert_eq!(config.audio.silence_threshold, 0.01);
        assert_eq!(config.audio.model, "base");
        assert_eq!(config.vision.capture_interval, 10);
        assert_eq!(config.vision.max_text_length, 1500);
        assert!(config.llm.use_local);
        assert_eq!(config.llm.max_tokens, 150);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.ui.auto_dismiss_time, 10);
        assert_eq!(config.triggers.direct_activation, vec!["hey cluely", "cluely"]);
    }

    #[test]
    fn partial_file_falls_back_to_section_defaults() {
        let raw = r#"{ "llm": { "max_tokens": 256 }, "ui": { "auto_dismiss_time": 0 } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.llm.max_tokens, 256);
        // Untouched fields in a partial section keep their defaults
        assert!(config.llm.use_local);
        assert_eq!(config.ui.auto_dismiss_time, 0);
        // Whole missing sections keep their defaults
        assert_eq!(config.audio.listen_duration, 5.0);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        config.audio.silence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.llm.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.vision.capture_interval = 0;
        assert!(config.validate().is_err());

        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.llm.max_tokens, 150);

        // A second load reads the file it just wrote
        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.audio.model, config.audio.model);
    }

    #[test]
    fn whisper_paths_follow_model_variant() {
        let mut config = AppConfig::default();
        config.audio.model = "small".to_string();
        config.model_dir = PathBuf::from("/opt/models");
        assert_eq!(config.whisper_encoder_path(), PathBuf::from("/opt/models/sherpa-onnx-whisper-small/small-encoder.int8.onnx"));
        assert_eq!(config.whisper_tokens_path(), PathBuf::from("/opt/models/sherpa-onnx-whisper-small/small-tokens.txt"));
    }

    #[test]
    fn gguf_scan_picks_first_in_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zephyr-7b.Q4_K_M.gguf"), b"x").unwrap();
        std::fs::write(dir.path().join("mistral-7b-instruct.Q4_K_M.gguf"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let mut config = AppConfig::default();
        config.model_dir = dir.path().to_path_buf();

        let found = config.find_gguf_model().unwrap();
        assert_eq!(found.file_name().unwrap(), "mistral-7b-instruct.Q4_K_M.gguf");
    }

    #[test]
    fn gguf_scan_handles_missing_directory() {
        let mut config = AppConfig::default();
        config.model_dir = PathBuf::from("/nonexistent/cluely-models");
        assert!(config.find_gguf_model().is_none());
    }
}
