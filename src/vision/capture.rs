//! Screen capture and OCR.
//!
//! Captures the primary monitor with xcap and extracts text by invoking the
//! external `tesseract` binary, the same tool the original desktop setups
//! rely on. OCR output is noisy, so the raw text goes through an artifact
//! filter before anything downstream sees it.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use image::RgbaImage;
use thiserror::Error;
use tracing::debug;
use xcap::Monitor;

/// Errors from the screen capture and OCR pipeline.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("tesseract binary not found on PATH (install it or run `cluely setup`)")]
    OcrMissing,
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capture the primary monitor as an image.
///
/// # Errors
/// Returns [`VisionError::Capture`] if no monitor is available or the
/// capture itself fails (e.g. missing screen-recording permission).
pub fn capture_screen() -> Result<RgbaImage, VisionError> {
    let monitors = Monitor::all().map_err(|e| VisionError::Capture(e.to_string()))?;

    let monitor = monitors
        .into_iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .ok_or_else(|| VisionError::Capture("no primary monitor found".to_string()))?;

    monitor.capture_image().map_err(|e| VisionError::Capture(e.to_string()))
}

/// Run OCR over an image using the external `tesseract` binary.
///
/// The image is written to a temp file and `tesseract <file> stdout` is
/// invoked; no OCR engine is linked into the binary.
///
/// # Errors
/// Returns [`VisionError::OcrMissing`] when tesseract is not installed,
/// [`VisionError::Ocr`] when it exits unsuccessfully.
pub fn ocr_image(image: &RgbaImage) -> Result<String, VisionError> {
    let png_path = scratch_png_path();
    image.save(&png_path).map_err(|e| VisionError::Ocr(format!("failed to write screenshot: {}", e)))?;

    let output = Command::new("tesseract").arg(&png_path).arg("stdout").arg("--psm").arg("3").output();

    // Best effort; the next capture overwrites the same path anyway
    let _ = std::fs::remove_file(&png_path);

    let output = match output {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(VisionError::OcrMissing),
        Err(e) => return Err(e.into()),
    };

    if !output.status.success() {
        return Err(VisionError::Ocr(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Capture the screen and return cleaned OCR text.
///
/// Blocking (file I/O plus an external process); callers on the async
/// executor should wrap this in `spawn_blocking`.
pub fn get_screen_text(max_text_length: usize) -> Result<String, VisionError> {
    let image = capture_screen()?;
    let raw = ocr_image(&image)?;
    let cleaned = clean_ocr_text(&raw, max_text_length);

    if cleaned.is_empty() {
        debug!("👁️ No readable text found on screen");
    } else {
        debug!("👁️ Screen text: \"{}...\"", cleaned.chars().take(80).collect::<String>());
    }

    Ok(cleaned)
}

/// Scratch path for the screenshot handed to tesseract.
fn scratch_png_path() -> PathBuf {
    std::env::temp_dir().join(format!("cluely-screen-{}.png", std::process::id()))
}

/// Clean raw OCR output.
///
/// Filters the usual OCR artifacts: drops very short lines, drops lines
/// that are mostly special characters, scrubs symbol runs, collapses
/// whitespace, and caps the total length so a busy screen cannot drown the
/// prompt.
pub fn clean_ocr_text(text: &str, max_text_length: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned_lines: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim();

        // Very short lines are almost always artifacts
        if line.len() < 3 {
            continue;
        }

        // Skip lines that are mostly special characters
        let special = line.chars().filter(|c| is_special(*c)).count();
        if special as f32 / line.chars().count() as f32 > 0.4 {
            continue;
        }

        // Scrub leftover symbol runs and normalize whitespace
        let scrubbed: String = line.chars().map(|c| if is_allowed(c) { c } else { ' ' }).collect();
        let normalized = scrubbed.split_whitespace().collect::<Vec<_>>().join(" ");

        if normalized.len() > 3 && normalized.chars().any(|c| c.is_alphanumeric()) {
            cleaned_lines.push(normalized);
        }
    }

    let mut cleaned = cleaned_lines.join(" ");

    if cleaned.len() > max_text_length {
        let mut cut = max_text_length;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
        cleaned.push_str("...");
    }

    cleaned
}

/// Characters counted as OCR noise when measuring a line's special-char ratio.
fn is_special(c: char) -> bool {
    !(c.is_alphanumeric() || c.is_whitespace() || "-.,!?:;()[]{}".contains(c))
}

/// Characters allowed to survive the scrub pass.
fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || c == '_' || "-.,!?:;()[]{}@#$%&*+=<>/\\|`~\"'".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_short_and_noisy_lines() {
        let raw = "ab\n¤¤¤¤ §§ ¤¤¤¤\nHello world, this is readable text.\n";
        let cleaned = clean_ocr_text(raw, 1500);
        assert_eq!(cleaned, "Hello world, this is readable text.");
    }

    #[test]
    fn collapses_whitespace() {
        let raw = "Some    spaced\t\tout     text here";
        assert_eq!(clean_ocr_text(raw, 1500), "Some spaced out text here");
    }

    #[test]
    fn scrubs_symbol_runs_but_keeps_punctuation() {
        let raw = "Total: $42.50 (incl. tax) ▚▚ done!";
        let cleaned = clean_ocr_text(raw, 1500);
        assert!(cleaned.contains("$42.50"));
        assert!(cleaned.contains("(incl. tax)"));
        assert!(!cleaned.contains('▚'));
    }

    #[test]
    fn truncates_long_text_with_ellipsis() {
        let raw = "word ".repeat(600);
        let cleaned = clean_ocr_text(&raw, 100);
        assert!(cleaned.len() <= 103);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(clean_ocr_text("", 1500), "");
        assert_eq!(clean_ocr_text("\n\n  \n", 1500), "");
    }
}
