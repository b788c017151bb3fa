//! First-run setup: model downloads and external tool checks.
//!
//! Downloads the Whisper ONNX bundle the recognizer needs, verifies the
//! `tesseract` binary, and reports which LLM backends are reachable.
//! Idempotent: anything already present is skipped.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Release hosting the pre-converted Whisper bundles.
const WHISPER_RELEASE_BASE: &str = "https://github.com/k2-fsa/sherpa-onnx/releases/download/asr-models";

/// Run the full setup sequence.
pub async fn run(config: &AppConfig) -> Result<()> {
    info!("🔧 Setting up Cluely");

    if !config.model_dir.exists() {
        fs::create_dir_all(&config.model_dir).with_context(|| format!("Failed to create {}", config.model_dir.display()))?;
        info!("Created models directory: {}", config.model_dir.display());
    }

    if whisper_complete(config) {
        info!("✅ Whisper model already present ({})", config.whisper_dir().display());
    } else {
        download_whisper(config).await?;
        config.validate_models().context("Whisper bundle incomplete after download")?;
        info!("✅ Whisper model ready");
    }

    match tesseract_version() {
        Ok(version) => info!("✅ Tesseract found: {}", version),
        Err(e) => warn!("⚠️ {:#} - screen OCR will be disabled until it is installed", e),
    }

    report_llm_backends(config);

    info!("✅ Setup complete");
    Ok(())
}

/// Whether all Whisper model files are present.
pub fn whisper_complete(config: &AppConfig) -> bool {
    [config.whisper_encoder_path(), config.whisper_decoder_path(), config.whisper_tokens_path()].iter().all(|p| p.exists())
}

/// Download and unpack the Whisper bundle for the configured variant.
async fn download_whisper(config: &AppConfig) -> Result<()> {
    let archive_name = format!("sherpa-onnx-whisper-{}.tar.bz2", config.audio.model);
    let url = format!("{}/{}", WHISPER_RELEASE_BASE, archive_name);

    info!("📥 Downloading {}", url);

    let response = reqwest::get(&url).await.context("Download request failed")?.error_for_status().context("Download request rejected")?;

    let total = response.content_length();
    let mut stream = response.bytes_stream();
    let mut bytes: Vec<u8> = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut last_logged_pct = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Download interrupted")?;
        bytes.extend_from_slice(&chunk);

        if let Some(total) = total {
            let pct = bytes.len() as u64 * 100 / total.max(1);
            if pct >= last_logged_pct + 10 {
                last_logged_pct = pct;
                info!("  {}% ({:.1} MB / {:.1} MB)", pct, bytes.len() as f64 / 1e6, total as f64 / 1e6);
            }
        }
    }

    info!("📦 Unpacking {} ({:.1} MB)", archive_name, bytes.len() as f64 / 1e6);

    let dest = config.model_dir.clone();
    tokio::task::spawn_blocking(move || unpack_archive(&bytes, &dest)).await.context("Unpack task panicked")??;

    Ok(())
}

/// Unpack a `.tar.bz2` archive into the destination directory.
///
/// The sherpa bundles carry their own top-level directory, which is exactly
/// the layout the model path helpers expect.
fn unpack_archive(bytes: &[u8], dest: &Path) -> Result<()> {
    let decoder = bzip2::read::BzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest).with_context(|| format!("Failed to unpack archive into {}", dest.display()))?;
    Ok(())
}

/// Probe the external tesseract binary.
///
/// # Errors
/// Returns an error when the binary is missing or fails to run.
pub fn tesseract_version() -> Result<String> {
    let output = Command::new("tesseract").arg("--version").output().context("Tesseract OCR not installed")?;

    if !output.status.success() {
        anyhow::bail!("tesseract --version exited with {}", output.status);
    }

    // Older tesseract prints the version banner to stderr
    let banner = if output.stdout.is_empty() { &output.stderr } else { &output.stdout };
    let first_line = String::from_utf8_lossy(banner).lines().next().unwrap_or("unknown version").to_string();
    Ok(first_line)
}

/// Log which LLM backends are currently reachable.
fn report_llm_backends(config: &AppConfig) {
    match config.find_gguf_model() {
        Some(path) => info!("✅ Local model available: {}", path.display()),
        None => info!("ℹ️ No .gguf model in {} (download one from https://huggingface.co/models?search=gguf)", config.model_dir.display()),
    }

    for key in ["GEMINI_API_KEY", "OPENAI_API_KEY"] {
        if std::env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            info!("✅ {} is set", key);
        } else {
            info!("ℹ️ {} is not set", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_complete_requires_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.model_dir = dir.path().to_path_buf();
        config.audio.model = "base".to_string();

        assert!(!whisper_complete(&config));

        let bundle = config.whisper_dir();
        fs::create_dir_all(&bundle).unwrap();
        fs::write(config.whisper_encoder_path(), b"x").unwrap();
        fs::write(config.whisper_decoder_path(), b"x").unwrap();
        assert!(!whisper_complete(&config));

        fs::write(config.whisper_tokens_path(), b"x").unwrap();
        assert!(whisper_complete(&config));
    }

    #[test]
    fn unpack_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        assert!(unpack_archive(b"not an archive", dir.path()).is_err());
    }
}
