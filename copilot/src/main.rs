//! # Copilot operator console
//!
//! Text front end over the command/status layer: connects to a running
//! controller, prints status in display units, forwards one operator action
//! per invocation, and logs operator messages.
//!
//! # Usage
//!
//! ```bash
//! # One status snapshot
//! copilot status
//!
//! # Follow status over the pub/sub transport
//! copilot --transport pubsub watch
//!
//! # Home every joint, then run the loaded program from line 10
//! copilot send home
//! copilot send run 10
//! ```

#![deny(warnings)]

mod action;
mod cli;
mod report;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use copilot_client::{Session, SessionWorker, status_code};
use copilot_common::config::{ConfigError, CopilotConfig, LogLevel, load_config};
use copilot_common::consts::DEFAULT_CONFIG_PATH;
use copilot_common::status::StatusSnapshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Args, Cmd};

fn main() {
    if let Err(e) = run() {
        error!("copilot failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load(&args);
    let log_level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);
    let mut config = config?;

    if let Some(transport) = args.transport {
        config.controller.transport = transport.into();
    }
    info!(
        "{} v{} starting ({:?} transport)",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION"),
        config.controller.transport
    );

    let mut session = Session::from_config(&config)?;
    session.connect()?;

    match args.command {
        Cmd::Status { raw } => {
            session.update_status()?;
            drain_messages(&mut session);
            if raw {
                println!("{}", serde_json::to_string_pretty(session.status())?);
            } else {
                print!("{}", report::summary(session.status(), &config.display));
            }
        }
        Cmd::Watch { interval_ms } => watch(session, &config, Duration::from_millis(interval_ms))?,
        Cmd::Send { action } => {
            let result = action::dispatch(&mut session, &action);
            drain_messages(&mut session);
            let code = status_code(&result);
            match result {
                Ok(()) => info!(serial = session.serial(), code, "command completed"),
                Err(e) => {
                    error!(code, "command failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

/// Explicit `--config` must load; the default path is optional.
fn load(args: &Args) -> Result<CopilotConfig, ConfigError> {
    match &args.config {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(Path::new(DEFAULT_CONFIG_PATH)),
        None => Ok(CopilotConfig::default()),
    }
}

fn drain_messages(session: &mut Session) {
    loop {
        match session.update_error() {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                warn!("error channel: {e}");
                break;
            }
        }
    }
    let messages = session.messages_mut();
    if let Some(text) = messages.take_error() {
        error!("operator error: {text}");
    }
    if let Some(text) = messages.take_text() {
        info!("operator text: {text}");
    }
    if let Some(text) = messages.take_display() {
        info!("operator display: {text}");
    }
}

fn watch(session: Session, config: &CopilotConfig, interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let worker = SessionWorker::spawn(session, interval)?;
    let mut last_shown: Option<StatusSnapshot> = None;
    while running.load(Ordering::SeqCst) {
        let snapshot = worker.snapshot();
        if last_shown.as_ref() != Some(&*snapshot) {
            print!("{}", report::summary(&snapshot, &config.display));
            last_shown = Some((*snapshot).clone());
        }
        if let Some(text) = worker.take_error() {
            error!("operator error: {text}");
        }
        if let Some(text) = worker.take_text() {
            info!("operator text: {text}");
        }
        if let Some(text) = worker.take_display() {
            info!("operator display: {text}");
        }
        std::thread::sleep(interval);
    }

    if worker.shutdown().is_none() {
        warn!("session worker did not shut down cleanly");
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
