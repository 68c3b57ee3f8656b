//! Help Desk
//!
//! Runs one help desk simulation and prints its events to the console.
//!
//! ```text
//! help-desk <seekers> <helpers> <chairs> <quota>
//! ```
//!
//! # Environment
//!
//! - `HELP_DESK_SESSION_MICROS` - session duration (default 200)
//! - `HELP_DESK_THINK_MICROS` - seeker think time between sessions (default 2000)
//! - `HELP_DESK_RETRY_BACKOFF_MICROS` - retry delay after a full room (default 2000)
//! - `HELP_DESK_CHANNEL_BUFFER` - coordinator mailbox size (default 64)
//! - `RUST_LOG` - log filter (default `help_desk=info`)

#![warn(clippy::pedantic)]

use anyhow::Context;
use help_desk::config::USAGE;
use help_desk::{Config, ConfigError, DeskError, DeskEvent, EventSink, Simulation};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "help_desk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_env(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            if e != ConfigError::Usage {
                eprintln!("{USAGE}");
            }
            return Err(DeskError::from(e)).context("invalid arguments");
        }
    };

    let (events, rx) = EventSink::channel();
    let console = tokio::spawn(print_events(rx));

    let result = Simulation::new(config).with_events(events).run().await;

    // The sink is dropped with the simulation, so the console drains and exits.
    if let Err(e) = console.await {
        error!(target: "hd.console", error = %e, "Console task failed");
    }

    match result {
        Ok(report) => {
            info!(target: "hd.console", "Summary: {report}");
            Ok(())
        }
        Err(e) => {
            error!(target: "hd.console", error = %e, error_type = e.as_label(), "Simulation failed");
            Err(e).context("simulation failed")
        }
    }
}

/// Log every simulation event in arrival order.
async fn print_events(mut rx: mpsc::UnboundedReceiver<DeskEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            DeskEvent::Admitted {
                seeker,
                waiting,
                empty_chairs,
                total_admitted,
            } => info!(
                target: "hd.console",
                "{seeker} takes a seat. Waiting: {waiting}, empty chairs: {empty_chairs}, admitted so far: {total_admitted}"
            ),
            DeskEvent::Rejected { seeker } => info!(
                target: "hd.console",
                "{seeker} found no empty chair and will try later"
            ),
            DeskEvent::SessionStarted {
                helper,
                seeker,
                session,
            } => info!(
                target: "hd.console",
                "{helper} is helping {seeker} (session {session})"
            ),
            DeskEvent::SessionEnded { helper, seeker } => info!(
                target: "hd.console",
                "{seeker} received help from {helper}"
            ),
            DeskEvent::SeekerFinished {
                seeker,
                sessions,
                remaining,
            } => info!(
                target: "hd.console",
                "{seeker} is done after {sessions} sessions, {remaining} seekers left"
            ),
            DeskEvent::ShutdownStarted => {
                info!(target: "hd.console", "All seekers done, helpers going home");
            }
        }
    }
}
