//! Daemon entry point — VoiceFlow push-to-talk dictation.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run) and validate it
//!    (audio format, hotkey name, provider API keys).
//! 3. Acquire the single-instance lock — a second launch exits here.
//! 4. Open the microphone and start the capture stream into the sink.
//! 5. Build the transcription/enhancement gateways, delivery and indicator.
//! 6. Create the tokio runtime, spawn [`RecordingController::run`].
//! 7. Start the hotkey listener thread.
//! 8. Block until Ctrl-C.
//!
//! Exit codes: `0` after a normal shutdown, `1` when any startup step fails
//! (missing device, unresolvable API key, instance already running).

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use voiceflow::audio::AudioCapture;
use voiceflow::config::{AppConfig, AppPaths};
use voiceflow::deliver::SystemDelivery;
use voiceflow::gateway::{
    EnhancementGateway, HttpEnhancer, HttpTranscriber, TranscriptionGateway,
};
use voiceflow::hotkey::{parse_key, HotkeyListener};
use voiceflow::instance::InstanceGuard;
use voiceflow::pipeline::RecordingController;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("VoiceFlow starting up");

    match run() {
        Ok(()) => {
            log::info!("VoiceFlow shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("startup failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    // --- Configuration -----------------------------------------------------
    let paths = AppPaths::new();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("failed to load settings ({e}); using defaults");
        AppConfig::default()
    });
    config.validate()?;

    let Some(key) = parse_key(&config.hotkey.push_to_talk_key) else {
        anyhow::bail!("unknown push-to-talk key {:?}", config.hotkey.push_to_talk_key);
    };

    // --- Single instance ---------------------------------------------------
    let _instance = InstanceGuard::acquire(&paths.lock_file)?;

    // --- Microphone --------------------------------------------------------
    let capture = AudioCapture::open()?;
    log::info!(
        "input device ready ({} Hz, {} ch)",
        capture.sample_rate(),
        capture.channels()
    );

    let sink = capture.sink(config.audio.max_recording_secs);
    // The stream runs for the daemon's lifetime; the sink gates what is kept.
    let _stream = capture.start(sink.clone())?;

    // --- Pipeline stages ---------------------------------------------------
    let transcription_timeout = Duration::from_secs(config.transcription.timeout_secs);
    let transcription = Arc::new(TranscriptionGateway::new(
        Arc::new(HttpTranscriber::from_endpoint(
            &config.transcription.primary,
            transcription_timeout,
        )?),
        Arc::new(HttpTranscriber::from_endpoint(
            &config.transcription.fallback,
            transcription_timeout,
        )?),
    ));

    let enhancement_timeout = Duration::from_secs(config.enhancement.timeout_secs);
    let enhancement = Arc::new(EnhancementGateway::new(
        Arc::new(HttpEnhancer::from_endpoint(
            &config.enhancement.primary,
            enhancement_timeout,
            config.enhancement.temperature,
        )?),
        Arc::new(HttpEnhancer::from_endpoint(
            &config.enhancement.fallback,
            enhancement_timeout,
            config.enhancement.temperature,
        )?),
    ));

    let delivery = Arc::new(SystemDelivery::from_config(&config.delivery));
    let indicator = voiceflow::status::from_config(&config.status);

    let controller = RecordingController::new(
        Arc::new(sink),
        transcription,
        enhancement,
        delivery,
        indicator,
        config.audio.clone(),
    );

    // --- Runtime + event sources -------------------------------------------
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let (hotkey_tx, hotkey_rx) = tokio::sync::mpsc::channel(16);
    let _listener = HotkeyListener::start(key, hotkey_tx);
    log::info!(
        "listening; hold {} to record",
        config.hotkey.push_to_talk_key
    );

    rt.block_on(async move {
        let controller_task = tokio::spawn(controller.run(hotkey_rx));
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupt received, shutting down");
            }
            _ = controller_task => {
                log::warn!("recording controller stopped unexpectedly");
            }
        }
    });

    Ok(())
}
