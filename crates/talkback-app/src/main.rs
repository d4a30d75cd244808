//! Talkback application binary - composition root.
//!
//! Ties the crates together into a terminal voice chat:
//! 1. Parse CLI args and load configuration from TOML
//! 2. Wire the console speech backends and the rule-based agent into a
//!    `VoiceSession`
//! 3. Mirror session status changes and lifecycle events to the terminal
//! 4. Run until Ctrl-C, then stop the session cleanly

mod cli;
mod console;

use std::sync::Arc;

use clap::Parser;

use talkback_agent::{ChatAgent, RuleAgent};
use talkback_core::config::{SessionConfig, TalkbackConfig};
use talkback_session::VoiceSession;

use cli::CliArgs;
use console::{ConsoleRecognition, ConsoleSynthesis};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first; the log level may come from it.
    let config_file = args.resolve_config_path();
    let config = TalkbackConfig::load_or_default(&config_file);

    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Talkback v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let session_config = if args.fast {
        SessionConfig::fast()
    } else {
        config.session.clone()
    };

    let agent: Arc<dyn ChatAgent> = Arc::new(RuleAgent::new());
    let recognition = ConsoleRecognition::new();
    let input = recognition.clone();
    let session = VoiceSession::new(
        recognition,
        ConsoleSynthesis::default(),
        agent,
        session_config,
    );
    tracing::info!(session_id = %session.id(), "Voice session assembled");

    // Mirror status changes to the terminal.
    let mut snapshots = session.subscribe();
    tokio::spawn(async move {
        let mut last = String::new();
        while snapshots.changed().await.is_ok() {
            let (status, category) = {
                let snap = snapshots.borrow_and_update();
                (snap.status.clone(), snap.status_category)
            };
            if status != last {
                println!("  [{category}] {status}");
                last = status;
            }
        }
    });

    // Lifecycle events go to the log.
    let mut events = session.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(
                event = event.event_name(),
                session_id = %event.session_id(),
                "Session event"
            );
        }
    });

    println!("Talkback voice chat. Type a line and press Enter to \"speak\"; Ctrl-C to quit.");
    session.start().await?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Interrupted, shutting down");
        }
        _ = input.closed() => {
            tracing::info!("Input closed, shutting down");
        }
    }
    session.stop();

    Ok(())
}
