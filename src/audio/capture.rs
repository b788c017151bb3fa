//! Microphone capture using cpal.
//!
//! Streams audio from the default input device into a caller-supplied
//! callback. Includes automatic resampling when the device sample rate
//! differs from the recognition rate, and a lock-free ring buffer so the
//! audio callback never blocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::ResamplerState;
use super::util::{downmix_to_mono, find_best_config, get_device_name};

/// Ring buffer capacity in samples (~4 seconds at 16 kHz).
const RING_CAPACITY: usize = 65_536;

/// Audio capturer that streams microphone samples to a callback.
///
/// The cpal callback only pushes into a lock-free ring buffer; a drain
/// thread moves samples into a bounded channel, and a callback thread hands
/// them to the consumer. This keeps the real-time audio path free of locks.
pub struct Capturer {
    stream: Stream,                                       // cpal audio stream (kept alive)
    shutdown: Arc<AtomicBool>,                            // Permanent shutdown flag
    drain_handle: Option<std::thread::JoinHandle<()>>,    // Thread draining ring buffer
    callback_handle: Option<std::thread::JoinHandle<()>>, // Thread calling user callback
    consumer: Option<ringbuf::HeapCons<f32>>,             // Ring buffer consumer
    sender: Option<SyncSender<Vec<f32>>>,                 // Channel sender to callback thread
}

impl Capturer {
    /// Create a new audio capturer.
    ///
    /// # Arguments
    /// * `sample_rate` - The desired sample rate (16000 for speech recognition)
    /// * `callback` - Function to call with captured audio samples
    ///
    /// # Errors
    /// Returns an error if:
    /// - No input device is available
    /// - Failed to get supported input configurations
    /// - Failed to build input stream
    pub fn new<F>(sample_rate: u32, callback: F) -> Result<Self>
    where
        F: Fn(&[f32]) + Send + 'static,
    {
        // Bounded channel for backpressure (32 chunks ~= 1 second of audio)
        let (sender, receiver) = mpsc::sync_channel::<Vec<f32>>(32);

        // Separate thread hands samples to the consumer so channel draining
        // is decoupled from any lock the callback might take
        let callback_handle = std::thread::spawn(move || {
            while let Ok(samples) = receiver.recv() {
                callback(&samples);
            }
            debug!("Audio callback thread exiting");
        });

        let host = cpal::default_host();
        let device = host.default_input_device().context("No input device available")?;

        info!("Using input device: {}", get_device_name(&device));

        let supported_configs = device.supported_input_configs().context("Failed to get supported input configs")?;

        let config = find_best_config(supported_configs, sample_rate)?;
        let device_sample_rate = config.sample_rate();

        let needs_resampling = device_sample_rate != sample_rate;
        if needs_resampling {
            info!("Device sample rate {} Hz differs from target {} Hz - resampling will be applied", device_sample_rate, sample_rate);
        }

        debug!("Audio capture config: {} Hz, {} channels, {:?}", device_sample_rate, config.channels(), config.sample_format());

        let shutdown = Arc::new(AtomicBool::new(false));
        let channels = config.channels() as usize;

        let stream_config: StreamConfig = config.config();

        let err_fn = |err| {
            tracing::error!("Audio capture error: {}", err);
        };

        let ring = HeapRb::<f32>::new(RING_CAPACITY);
        let (mut producer, consumer) = ring.split();

        let resampler_state = if needs_resampling { Some(ResamplerState::new(device_sample_rate, sample_rate)?) } else { None };

        // Build F32 input stream (guaranteed by find_best_config)
        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples = downmix_to_mono(data, channels);

                let final_samples = match &resampler_state {
                    Some(state) => state.lock().process_samples(&samples),
                    None => Some(samples),
                };

                // Push to ring buffer (lock-free, non-blocking)
                if let Some(samples) = final_samples {
                    let written = producer.push_slice(&samples);
                    if written < samples.len() {
                        static DROP_COUNT: AtomicU64 = AtomicU64::new(0);
                        let count = DROP_COUNT.fetch_add(1, Ordering::Relaxed);
                        if count.is_multiple_of(100) {
                            tracing::warn!("Ring buffer full, dropped {} audio chunks", count + 1);
                        }
                    }
                }
            },
            err_fn,
            None,
        )?;

        info!("Audio capture configured: device {} Hz -> output {} Hz", device_sample_rate, sample_rate);

        Ok(Self { stream, shutdown, drain_handle: None, callback_handle: Some(callback_handle), consumer: Some(consumer), sender: Some(sender) })
    }

    /// Start capturing audio.
    pub fn start(&mut self) -> Result<()> {
        self.stream.play().context("Failed to start audio stream")?;

        if self.drain_handle.is_none() {
            let consumer = self.consumer.take().context("Consumer already taken")?;
            let sender = self.sender.take().context("Sender already taken")?;
            let drain_shutdown = self.shutdown.clone();

            let drain_handle = std::thread::spawn(move || {
                let mut consumer = consumer;
                let mut read_buffer = vec![0.0f32; 2048];

                loop {
                    if drain_shutdown.load(Ordering::Relaxed) {
                        debug!("Drain thread shutting down");
                        return;
                    }

                    let available = consumer.occupied_len();
                    if available == 0 {
                        // 100µs keeps latency low without busy-waiting
                        std::thread::sleep(std::time::Duration::from_micros(100));
                        continue;
                    }

                    let to_read = available.min(read_buffer.len());
                    let read = consumer.pop_slice(&mut read_buffer[..to_read]);

                    if read > 0 {
                        // Send to channel (blocks on full for backpressure)
                        let samples_to_send = read_buffer[..read].to_vec();
                        if sender.send(samples_to_send).is_err() {
                            debug!("Audio channel closed, drain thread exiting");
                            return;
                        }
                    }
                }
            });

            self.drain_handle = Some(drain_handle);
            info!("🎙️ Audio capture started");
        }

        Ok(())
    }

    /// Permanently stop and clean up.
    /// Call this on program shutdown to ensure threads exit cleanly.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.stream.pause();

        // Drop sender to wake up blocking recv/send
        drop(self.sender.take());

        // Wait for drain thread with timeout
        if let Some(handle) = self.drain_handle.take() {
            std::thread::sleep(std::time::Duration::from_millis(100));
            if !handle.is_finished() {
                warn!("Drain thread didn't exit in time");
            }
            if let Err(e) = handle.join() {
                warn!("Failed to join drain thread: {:?}", e);
            }
        }

        // Wait for callback thread with timeout
        if let Some(handle) = self.callback_handle.take() {
            std::thread::sleep(std::time::Duration::from_millis(100));
            if !handle.is_finished() {
                warn!("Callback thread didn't exit in time");
            }
            if let Err(e) = handle.join() {
                warn!("Failed to join callback thread: {:?}", e);
            }
        }

        info!("Audio capture stopped");
    }
}

impl Drop for Capturer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
