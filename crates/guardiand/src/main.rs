//! guardiand - The guardian background service
//!
//! This is the main entry point for the guardian service.
//! It wires together all the components:
//! - Configuration loading
//! - Escalation ports (logging stand-ins until real transports are wired)
//! - Supervisor actor and escalation dispatcher

use anyhow::{Context, Result};
use clap::Parser;
use guardian_api::{DurationPreset, SessionState};
use guardian_config::{load_config, EngineConfig};
use guardian_core::{EscalationPorts, SupervisorHandle};
use guardian_ports::{LoggingBrokerPort, LoggingEmergencyPort, LoggingGpsPort, TracingAuditLog};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// guardiand - Safety check-in timer and escalation service
#[derive(Parser, Debug)]
#[command(name = "guardiand")]
#[command(about = "Safety check-in timer and escalation service", long_about = None)]
struct Args {
    /// Configuration file path (or set GUARDIAN_CONFIG env var);
    /// built-in defaults are used when omitted
    #[arg(short, long, env = "GUARDIAN_CONFIG")]
    config: Option<PathBuf>,

    /// Start a session immediately with the configured policy
    #[arg(long)]
    start: bool,

    /// Duration preset in minutes for the started session (15, 30, 45 or 60)
    #[arg(short, long)]
    preset: Option<u32>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

struct Service {
    config: EngineConfig,
    handle: SupervisorHandle,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => EngineConfig::default(),
        };

        info!(
            preset_minutes = config.default_preset.minutes(),
            tick_interval_ms = config.tick_interval.as_millis() as u64,
            "Configuration loaded"
        );

        let ports = EscalationPorts {
            broker: Arc::new(LoggingBrokerPort),
            gps: Arc::new(LoggingGpsPort),
            emergency: Arc::new(LoggingEmergencyPort),
            audit: Arc::new(TracingAuditLog),
        };

        let handle = SupervisorHandle::spawn(&config, ports);

        Ok(Self { config, handle })
    }

    async fn run(self, args: &Args) -> Result<()> {
        if let Some(minutes) = args.preset {
            let preset = DurationPreset::from_minutes(minutes)
                .with_context(|| format!("Unsupported preset: {} minutes", minutes))?;
            self.handle.select_duration(preset).await?;
        }

        if args.start {
            let session_id = self.handle.start(self.config.policy).await?;
            info!(session_id = %session_id, "Session started from command line");
        }

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        let mut status_timer = tokio::time::interval(Duration::from_secs(30));
        status_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = status_timer.tick() => {
                    let view = self.handle.view().await?;
                    info!(
                        state = ?view.state,
                        remaining = %guardian_util::format_duration(Duration::from_secs(view.remaining_seconds)),
                        "Status"
                    );
                }
            }
        }

        // Graceful shutdown: a running countdown is abandoned, not escalated
        let view = self.handle.view().await?;
        if view.state != SessionState::Ready {
            if let Some(session_id) = view.session_id {
                info!(session_id = %session_id, state = ?view.state, "Resetting session");
            }
            if let Err(e) = self.handle.reset().await {
                warn!(error = %e, "Failed to reset session on shutdown");
            }
        }
        self.handle.shutdown();

        info!("Shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "guardiand starting");

    let service = Service::new(&args)?;
    service.run(&args).await
}
