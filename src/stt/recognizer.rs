//! Whisper speech recognizer.
//!
//! Transcribes the listen windows produced by the audio stage. The
//! recognizer holds Whisper behind its own mutex because transcription is
//! slow (100-500ms); the lock is never taken on the capture path.

use anyhow::Result;
use parking_lot::Mutex;
use sherpa_rs::whisper::{WhisperConfig, WhisperRecognizer};
use tracing::{debug, info};

use crate::config::AppConfig;

/// Speech recognizer backed by Whisper int8 ONNX models.
pub struct Recognizer {
    whisper: Mutex<WhisperRecognizer>,
    sample_rate: u32,
}

impl Recognizer {
    /// Create a new speech recognizer.
    ///
    /// # Errors
    /// Returns an error if the Whisper model files are missing or invalid.
    pub fn new(config: &AppConfig, sample_rate: u32, verbose: bool) -> Result<Self> {
        let encoder_path = config.whisper_encoder_path().to_string_lossy().to_string();
        let decoder_path = config.whisper_decoder_path().to_string_lossy().to_string();
        let tokens_path = config.whisper_tokens_path().to_string_lossy().to_string();

        info!("Initializing Whisper ({}) from {}", config.audio.model, config.whisper_dir().display());
        debug!("Whisper encoder: {}", encoder_path);
        debug!("Whisper decoder: {}", decoder_path);
        debug!("Whisper tokens: {}", tokens_path);

        // Whisper is CPU-intensive; leave headroom for OCR and the LLM
        let num_threads = (num_cpus::get() / 3).max(1);

        let whisper_config = WhisperConfig {
            encoder: encoder_path,
            decoder: decoder_path,
            tokens: tokens_path,
            // Empty string lets Whisper auto-detect the spoken language
            language: String::new(),
            num_threads: Some(num_threads.try_into().unwrap_or(1)),
            debug: verbose,
            ..Default::default()
        };

        let whisper = WhisperRecognizer::new(whisper_config).map_err(|e| anyhow::anyhow!("Failed to initialize Whisper: {}", e))?;

        info!("Whisper recognizer initialized ({} threads)", num_threads);

        Ok(Self { whisper: Mutex::new(whisper), sample_rate })
    }

    /// Transcribe one listen window.
    ///
    /// Returns `None` for empty windows and empty transcription results.
    pub fn transcribe_window(&self, samples: &[f32]) -> Option<String> {
        if samples.is_empty() {
            debug!("Empty listen window");
            return None;
        }

        debug!("Transcribing {} samples", samples.len());

        let mut whisper = self.whisper.lock();
        let transcription_result = whisper.transcribe(self.sample_rate, samples);
        drop(whisper); // Release lock as soon as transcription is done

        let text = transcription_result.text.trim().to_string();

        if text.is_empty() {
            debug!("Empty transcription result");
            return None;
        }

        info!("🗣️ Heard: \"{}\"", text);
        Some(text)
    }
}
