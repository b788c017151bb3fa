//! Cluely - a proactive context-aware desktop assistant.
//!
//! Continuously listens to the microphone, transcribes speech with Whisper,
//! watches the screen through OCR, and generates contextual responses with
//! a local or cloud language model.

mod audio;
mod brain;
mod config;
mod llm;
mod metrics;
mod setup;
mod stt;
mod vision;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use parking_lot::RwLock;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::{Capturer, Listener};
use brain::{IntentKind, Presenter, Response, ResponseKind, Router, Trigger};
use config::{AppConfig, Cli, Command, SAMPLE_RATE};
use llm::LlmClient;
use metrics::{PerformanceMonitor, Stage};
use stt::Recognizer;
use vision::ScreenContext;

/// Character budget for assembled prompts.
const MAX_PROMPT_CHARS: usize = 4000;

/// Configuration for the brain task.
struct BrainTaskConfig {
    router: Router,                          // Trigger router
    llm_client: Arc<LlmClient>,              // LLM backend
    presenter: Presenter,                    // Response output
    screen: Arc<RwLock<ScreenContext>>,      // Latest screen snapshot
    monitor: Arc<PerformanceMonitor>,        // Timing metrics
    auto_dismiss_secs: u64,                  // Card dismiss time (0 = sticky)
    shutdown: Arc<AtomicBool>,               // Shutdown flag
}

/// Spawn the transcription task.
///
/// Receives completed listen windows from the audio stage and transcribes
/// them with Whisper on a blocking thread.
fn spawn_transcription_task(
    transcript_tx: mpsc::Sender<String>,
    mut window_rx: mpsc::Receiver<Vec<f32>>,
    recognizer: Arc<Recognizer>,
    monitor: Arc<PerformanceMonitor>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while !shutdown.load(Ordering::Relaxed) {
            // Use timeout to allow shutdown checks
            match tokio::time::timeout(Duration::from_millis(100), window_rx.recv()).await {
                Ok(Some(samples)) => {
                    let start = Instant::now();

                    let recognizer = recognizer.clone();
                    let transcript = match tokio::task::spawn_blocking(move || recognizer.transcribe_window(&samples)).await {
                        Ok(result) => result,
                        Err(e) => {
                            error!("Transcription task panicked: {}", e);
                            continue;
                        }
                    };

                    monitor.record(Stage::Audio, start.elapsed().as_secs_f64());

                    if let Some(text) = transcript
                        && transcript_tx.send(text).await.is_err()
                    {
                        debug!("Transcript channel closed");
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Listen window channel closed");
                    break;
                }
                Err(_) => {
                    // Timeout - continue to check shutdown flag
                    continue;
                }
            }
        }
    })
}

/// Spawn the vision task.
///
/// Refreshes the shared screen snapshot every `capture_interval` seconds.
/// Capture and OCR run on blocking threads; failures degrade to an empty
/// snapshot so the pipeline keeps going.
fn spawn_vision_task(
    screen: Arc<RwLock<ScreenContext>>,
    vision_config: config::VisionConfig,
    monitor: Arc<PerformanceMonitor>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ocr_missing_warned = false;

        while !shutdown.load(Ordering::Relaxed) {
            let start = Instant::now();
            let max_len = vision_config.max_text_length;

            let captured = tokio::task::spawn_blocking(move || {
                let text = vision::get_screen_text(max_len);
                let app = vision::get_active_app();
                (text, app)
            })
            .await;

            match captured {
                Ok((Ok(text), app)) => {
                    monitor.record(Stage::Vision, start.elapsed().as_secs_f64());
                    *screen.write() = ScreenContext { text, app, captured_at: Instant::now() };
                }
                Ok((Err(vision::VisionError::OcrMissing), app)) => {
                    if !ocr_missing_warned {
                        warn!("⚠️ Tesseract not found - running without screen text (run `cluely setup`)");
                        ocr_missing_warned = true;
                    }
                    *screen.write() = ScreenContext { text: String::new(), app, captured_at: Instant::now() };
                }
                Ok((Err(e), app)) => {
                    debug!("Vision error: {}", e);
                    *screen.write() = ScreenContext { text: String::new(), app, captured_at: Instant::now() };
                }
                Err(e) => {
                    error!("Vision task panicked: {}", e);
                }
            }

            // Sleep in short slices so shutdown stays responsive
            for _ in 0..vision_config.capture_interval * 10 {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    })
}

/// Spawn the brain task.
///
/// Routes each transcript, builds the prompt, runs the LLM, and presents
/// the response.
fn spawn_brain_task(mut transcript_rx: mpsc::Receiver<String>, task: BrainTaskConfig) -> JoinHandle<()> {
    let BrainTaskConfig { router, llm_client, presenter, screen, monitor, auto_dismiss_secs, shutdown } = task;

    tokio::spawn(async move {
        while !shutdown.load(Ordering::Relaxed) {
            let transcript = match tokio::time::timeout(Duration::from_millis(100), transcript_rx.recv()).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!("Transcript channel closed");
                    break;
                }
                Err(_) => continue,
            };

            let total_start = Instant::now();

            let context = screen.read().clone();
            debug!("Screen snapshot: app={}, {} chars, {:.0}s old", context.app, context.text.len(), context.captured_at.elapsed().as_secs_f64());

            let Some(trigger) = router.should_respond(&transcript, &context.text, &context.app) else {
                debug!("No trigger for: \"{}\"", transcript);
                continue;
            };

            info!("🎯 Triggered by: \"{}\"", transcript);

            let priority = brain::priority(&transcript);

            // Cancel words flush anything the user said while we were busy
            if brain::should_interrupt(&transcript, priority) {
                drain_channel(&mut transcript_rx, "queued transcript(s)");
            }

            let prompt = match &trigger {
                Trigger::Intent(IntentKind::Reminder(detail)) => brain::build_reminder_prompt(detail),
                Trigger::Intent(IntentKind::Question) => brain::build_question_prompt(&transcript, &context.text, &context.app),
                Trigger::Intent(IntentKind::Creative(_)) => brain::build_creative_prompt(&transcript, &context.text, &context.app),
                _ => brain::build_prompt(&transcript, &context.text, &context.app),
            };
            let prompt = brain::optimize_prompt_length(&prompt, MAX_PROMPT_CHARS);

            let llm_start = Instant::now();
            match llm_client.generate(&prompt).await {
                Ok(text) if !text.is_empty() => {
                    monitor.record(Stage::Llm, llm_start.elapsed().as_secs_f64());

                    let kind = response_kind(&trigger, &transcript, &context.app);
                    let auto_dismiss = if priority == brain::Priority::High || auto_dismiss_secs == 0 {
                        None
                    } else {
                        Some(Duration::from_secs(auto_dismiss_secs))
                    };

                    presenter.show(&Response { text, kind, auto_dismiss });
                    monitor.record(Stage::Total, total_start.elapsed().as_secs_f64());
                }
                Ok(_) => {
                    debug!("Empty LLM response");
                }
                Err(e) => {
                    error!("❌ LLM error: {:#}", e);
                    presenter.show_error(&format!("Failed to generate response: {:#}", e));
                }
            }
        }
    })
}

/// Map a trigger to the response kind shown on the card.
fn response_kind(trigger: &Trigger, transcript: &str, app: &str) -> ResponseKind {
    match trigger {
        Trigger::Intent(IntentKind::Reminder(_)) => ResponseKind::Reminder,
        Trigger::Intent(IntentKind::Question) => ResponseKind::Question,
        Trigger::Intent(IntentKind::Action(_)) => ResponseKind::Action,
        Trigger::Intent(IntentKind::Creative(_)) => ResponseKind::Creative,
        Trigger::Context { domain, .. } => match *domain {
            "social_media" => ResponseKind::SocialMedia,
            "communication" => ResponseKind::Communication,
            "writing" => ResponseKind::Writing,
            "web_browsing" => ResponseKind::WebBrowsing,
            _ => brain::classify_response(transcript, app),
        },
        Trigger::Direct(_) => brain::classify_response(transcript, app),
    }
}

/// Drain remaining messages from a channel.
fn drain_channel(rx: &mut mpsc::Receiver<String>, label: &str) {
    let mut discarded = 0;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        info!("🗑️ Discarded {} {}", discarded, label);
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown(shutdown: Arc<AtomicBool>) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }

    shutdown.store(true, Ordering::SeqCst);
}

/// Await a task handle, giving it a moment to notice the shutdown flag.
async fn join_with_timeout(handle: JoinHandle<()>, name: &str) {
    let graceful_timeout = Duration::from_millis(500);

    tokio::select! {
        _ = handle => {
            debug!("{} task finished gracefully", name);
        }
        _ = tokio::time::sleep(graceful_timeout) => {
            debug!("{} task didn't finish in time", name);
        }
    }
}

/// Run the assistant loop until a shutdown signal arrives.
async fn run_assistant(config: AppConfig, verbose: bool) -> Result<()> {
    info!("🧠 Cluely v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate_models() {
        error!("❌ {:#}", e);
        error!("Run `cluely setup` to download the speech models.");
        std::process::exit(1);
    }

    config.log_config();

    let monitor = Arc::new(PerformanceMonitor::new());

    let recognizer = Arc::new(Recognizer::new(&config, SAMPLE_RATE, verbose)?);
    let llm_client = Arc::new(LlmClient::new(&config)?);
    info!("🧠 LLM backend: {}", llm_client.backend_name());

    let router = Router::new(&config.triggers.direct_activation);
    let presenter = Presenter::new();

    // Audio path: capturer feeds the listener, the listener emits windows
    let (listener, window_rx) = Listener::new(SAMPLE_RATE, config.audio.listen_duration, config.audio.silence_threshold);
    let listener = Arc::new(listener);

    let listener_for_audio = listener.clone();
    let mut capturer = Capturer::new(SAMPLE_RATE, move |samples: &[f32]| {
        listener_for_audio.accept_samples(samples);
    })?;

    let screen = Arc::new(RwLock::new(ScreenContext::default()));
    let shutdown = Arc::new(AtomicBool::new(false));

    capturer.start()?;

    info!("🎙️ Listening for audio...");
    info!("👁️ Watching screen...");
    info!("🧠 AI ready to assist. Press Ctrl+C to stop.");

    let (transcript_tx, transcript_rx) = mpsc::channel::<String>(10);

    let transcription_handle = spawn_transcription_task(transcript_tx, window_rx, recognizer, monitor.clone(), shutdown.clone());

    let vision_handle = spawn_vision_task(screen.clone(), config.vision.clone(), monitor.clone(), shutdown.clone());

    let brain_handle = spawn_brain_task(
        transcript_rx,
        BrainTaskConfig {
            router,
            llm_client,
            presenter,
            screen,
            monitor: monitor.clone(),
            auto_dismiss_secs: config.ui.auto_dismiss_time,
            shutdown: shutdown.clone(),
        },
    );

    wait_for_shutdown(shutdown).await;

    // Stop audio first so no new windows are produced
    capturer.shutdown();

    join_with_timeout(transcription_handle, "Transcription").await;
    join_with_timeout(vision_handle, "Vision").await;
    join_with_timeout(brain_handle, "Brain").await;

    let report = monitor.report();
    if !report.is_empty() {
        info!("📊 Performance report:");
        for entry in report {
            info!("  {}: {:.3}s avg ({} samples)", entry.stage.label(), entry.average, entry.count);
        }
    }

    info!("👋 Cluely stopped. Goodbye!");
    Ok(())
}

/// Run the component self-tests. Returns true when everything passed.
async fn run_self_tests(config: &AppConfig) -> bool {
    println!("🧪 Running Cluely self-tests");
    println!("{}", "=".repeat(40));

    let mut passed = 0;
    let total = 5;

    // Environment: model files and external tools
    println!("Testing environment...");
    let mut issues = Vec::new();
    if let Err(e) = config.validate_models() {
        issues.push(format!("{:#}", e));
    }
    if let Err(e) = setup::tesseract_version() {
        issues.push(format!("{:#}", e));
    }
    if issues.is_empty() {
        println!("✅ Environment test passed");
        passed += 1;
    } else {
        println!("❌ Environment issues found:");
        for issue in &issues {
            println!("  - {}", issue);
        }
    }

    // Microphone: one second of capture, check the level
    println!("Testing microphone...");
    match microphone_check().await {
        Ok(peak) if peak > 1e-3 => {
            println!("✅ Microphone working (level {:.4})", peak);
            passed += 1;
        }
        Ok(peak) => {
            println!("⚠️ Microphone level very low ({:.4}) - check connection", peak);
        }
        Err(e) => {
            println!("❌ Microphone test failed: {:#}", e);
        }
    }

    // Screen capture + OCR round trip
    println!("Testing screen capture...");
    let max_len = config.vision.max_text_length;
    match tokio::task::spawn_blocking(move || vision::get_screen_text(max_len)).await {
        Ok(Ok(text)) => {
            println!("✅ Screen capture working");
            if !text.is_empty() {
                println!("  Sample text: \"{}\"", text.chars().take(50).collect::<String>());
            }
            passed += 1;
        }
        Ok(Err(e)) => {
            println!("❌ Screen capture test failed: {}", e);
        }
        Err(e) => {
            println!("❌ Screen capture test panicked: {}", e);
        }
    }

    // Visual parser: the probe answering at all is a pass, even when no
    // window is focused (headless sessions)
    println!("Testing visual parser...");
    {
        let app = vision::get_active_app();
        let windows = vision::window_titles();
        println!("✅ Visual parser working (active: {}, {} windows)", app, windows.len());
        if app != "Unknown" {
            let context = vision::detect_app_context(&app, windows.first().map(String::as_str).unwrap_or(""));
            println!("  Context: {}", context.kind);
        }
        passed += 1;
    }

    // LLM connectivity
    println!("Testing LLM...");
    match LlmClient::new(config) {
        Ok(client) => match client.generate("You are a helpful AI assistant. Respond with a brief greeting.").await {
            Ok(response) if !response.is_empty() => {
                println!("✅ LLM test passed ({})", client.backend_name());
                println!("  Response: {}", response.chars().take(80).collect::<String>());
                passed += 1;
            }
            Ok(_) => println!("❌ LLM returned an empty response"),
            Err(e) => println!("❌ LLM test failed: {:#}", e),
        },
        Err(e) => println!("❌ LLM unavailable: {:#}", e),
    }

    println!("\n📊 Test results: {}/{} passed", passed, total);
    passed == total
}

/// Capture one second of audio and return the peak level.
async fn microphone_check() -> Result<f32> {
    let samples = Arc::new(parking_lot::Mutex::new(Vec::<f32>::new()));
    let sink = samples.clone();

    let mut capturer = Capturer::new(SAMPLE_RATE, move |chunk: &[f32]| {
        sink.lock().extend_from_slice(chunk);
    })?;

    capturer.start()?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    capturer.shutdown();

    let samples = samples.lock();
    Ok(audio::util::peak_level(&samples))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG, fall back to the verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if cli.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    let mut config = AppConfig::load(&cli.config)?;
    config.apply_cli(&cli);

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {:#}", e);
        std::process::exit(1);
    }

    match cli.command {
        Some(Command::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Command::Setup) => setup::run(&config).await,
        Some(Command::Test) => {
            if run_self_tests(&config).await {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
        None => run_assistant(config, cli.verbose).await,
    }
}
