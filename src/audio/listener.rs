//! Listen-window segmentation with a silence gate.
//!
//! The assistant listens in fixed-duration windows rather than tracking
//! utterance boundaries: every `listen_duration` seconds of audio becomes a
//! candidate window, and windows whose peak level stays under the silence
//! threshold are discarded without ever reaching the recognizer.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::util::peak_level;

/// Segments the capture stream into listen windows and forwards the ones
/// that contain audible speech.
///
/// Thread-safe: `accept_samples` is called from the capture callback thread
/// while the receiver side lives on the async executor.
pub struct Listener {
    state: Mutex<WindowState>,
    window_samples: usize,
    silence_threshold: f32,
    window_tx: mpsc::Sender<Vec<f32>>,
}

struct WindowState {
    buffer: Vec<f32>,
}

impl Listener {
    /// Create a listener and the channel its speech windows arrive on.
    ///
    /// # Arguments
    /// * `sample_rate` - Capture sample rate in Hz
    /// * `listen_duration` - Window length in seconds
    /// * `silence_threshold` - Peak amplitude below which a window is dropped
    pub fn new(sample_rate: u32, listen_duration: f32, silence_threshold: f32) -> (Self, mpsc::Receiver<Vec<f32>>) {
        let window_samples = (sample_rate as f32 * listen_duration) as usize;

        // Small buffer: stale speech is worthless, drop instead of queueing
        let (window_tx, window_rx) = mpsc::channel(4);

        let listener = Self {
            state: Mutex::new(WindowState { buffer: Vec::with_capacity(window_samples) }),
            window_samples,
            silence_threshold,
            window_tx,
        };

        (listener, window_rx)
    }

    /// Feed captured samples, emitting completed listen windows.
    ///
    /// Emission is non-blocking: if the transcription stage is backed up the
    /// window is dropped with a warning rather than stalling the audio path.
    pub fn accept_samples(&self, samples: &[f32]) {
        let mut state = self.state.lock();
        state.buffer.extend_from_slice(samples);

        while state.buffer.len() >= self.window_samples {
            let window: Vec<f32> = state.buffer.drain(..self.window_samples).collect();

            let peak = peak_level(&window);
            if peak < self.silence_threshold {
                debug!("Listen window below silence threshold ({:.4}), skipping", peak);
                continue;
            }

            debug!("🎙️ Speech window completed ({} samples, peak {:.3})", window.len(), peak);

            if self.window_tx.try_send(window).is_err() {
                warn!("Dropping speech window (transcription busy)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_listener(threshold: f32) -> (Listener, mpsc::Receiver<Vec<f32>>) {
        // 1000 Hz, 1 second windows keeps the numbers small
        Listener::new(1000, 1.0, threshold)
    }

    #[test]
    fn emits_window_with_audible_speech() {
        let (listener, mut rx) = make_listener(0.01);
        let mut samples = vec![0.0f32; 1000];
        samples[500] = 0.5;

        listener.accept_samples(&samples);

        let window = rx.try_recv().expect("window should be emitted");
        assert_eq!(window.len(), 1000);
    }

    #[test]
    fn drops_silent_window() {
        let (listener, mut rx) = make_listener(0.01);
        listener.accept_samples(&vec![0.001f32; 1000]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn accumulates_across_small_chunks() {
        let (listener, mut rx) = make_listener(0.01);
        for _ in 0..9 {
            listener.accept_samples(&vec![0.2f32; 100]);
        }
        // 900 samples: window not complete yet
        assert!(rx.try_recv().is_err());

        listener.accept_samples(&vec![0.2f32; 100]);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn emits_multiple_windows_from_one_burst() {
        let (listener, mut rx) = make_listener(0.01);
        listener.accept_samples(&vec![0.2f32; 2500]);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        // 500 leftover samples stay buffered
        assert!(rx.try_recv().is_err());
    }
}
