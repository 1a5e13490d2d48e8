//! avatar-chat-daemon: Background daemon for a single-avatar video chat
//!
//! This daemon provides:
//! - Explicit conversation state machine (greeting, listening, response, goodbye)
//! - Single-capture speech session with stale-report rejection
//! - One-visible-clip media stage over a host playback backend
//! - IPC server for the UI shell (status, start, notifications)

mod config;
mod events;
mod intent;
mod ipc;
mod lifecycle;
mod media;
mod speech;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, EngineKind};
use crate::events::StateEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::media::{ClipStage, TimedBackend};
use crate::speech::{LineEngine, SpeechEngine, SpeechSession};
use crate::state::ConversationController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "avatar-chat-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.video_dir, "configuration loaded");

    // Register signal handlers before anything can fail midway
    let mut shutdown = ShutdownSignal::new()?;

    // Create channels for inter-component communication
    // UI shell, speech engine, media backend, watchdog -> controller
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    // Controller -> IPC server (for broadcasting state events)
    let (event_tx, _event_rx) = broadcast::channel::<StateEvent>(64);

    let engine: Option<Box<dyn SpeechEngine>> = match config.speech.engine {
        EngineKind::Stdin => match LineEngine::spawn() {
            Ok(engine) => {
                info!("speech input reads typed utterances from stdin");
                Some(Box::new(engine))
            }
            Err(e) => {
                error!(?e, "failed to start speech engine");
                warn!("continuing without speech recognition");
                None
            }
        },
        EngineKind::None => {
            warn!("speech recognition disabled by configuration");
            None
        }
    };

    let speech = SpeechSession::new(engine, config.speech.capture.clone(), control_tx.clone());
    let stage = ClipStage::new(TimedBackend::new(
        config.video_dir.clone(),
        config.clip_length,
        control_tx.clone(),
    ));
    let mut controller = ConversationController::new(
        stage,
        speech,
        config.watchdog.timeouts(),
        event_tx.clone(),
        control_tx.clone(),
    );

    // Create IPC server; subscribe before the controller boots
    let server = Server::new(&config.socket_path, event_tx.clone(), control_tx)?;
    let track_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the controller (processes inbound events)
        _ = controller.run(control_rx) => {
            info!("conversation controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Mirror controller events into the status view
        _ = server.track(track_rx) => {
            info!("state event tracker exited");
        }

        // Wait for shutdown signal
        reason = shutdown.wait() => {
            info!(?reason, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    controller.shutdown();
    let snapshot = controller.snapshot();
    info!(
        state = %snapshot.state,
        clip = ?snapshot.clip,
        transcript = %snapshot.transcript,
        "final conversation state"
    );
    server.shutdown().await;

    info!("avatar-chat-daemon stopped");

    Ok(())
}
