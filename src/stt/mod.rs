//! Speech-to-text module.
//!
//! Wraps the sherpa-rs Whisper recognizer for per-window transcription.

mod recognizer;

pub use recognizer::Recognizer;
