//! Alert Console
//!
//! Terminal front end for a live alert stream: prints the alert panel,
//! raises notifications for newly pushed alerts, and accepts simple
//! dismissal commands on stdin.

pub mod settings;
pub mod view;

use alert_stream::{AlertStream, StreamEvent};
use alerting::AlertId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use settings::{LogSettings, Settings, SettingsError};

/// Output mode for the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

/// A command read from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `d <id>`: dismiss an alert from the list
    DismissAlert(AlertId),
    /// `n <id>`: dismiss a notification
    DismissNotification(u64),
    /// `l`: print the panel again
    List,
    /// `q`: quit
    Quit,
}

impl Command {
    /// Parse one input line; `None` for blank or unknown input
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let command = match (parts.next()?, parts.next()) {
            ("d", Some(id)) => Command::DismissAlert(AlertId::new(id)),
            ("n", Some(id)) => Command::DismissNotification(id.parse().ok()?),
            ("l", None) => Command::List,
            ("q", None) => Command::Quit,
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(command)
    }
}

/// Initialize logging
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(settings: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set tracing subscriber");
}

fn print_panel(stream: &AlertStream, mode: OutputMode) {
    match mode {
        OutputMode::Text => {
            println!("--- Alerts ---");
            for line in view::render_panel(&stream.panel(), &stream.alerts()) {
                println!("{}", line);
            }
        }
        OutputMode::Json => println!("{}", view::alerts_json(&stream.alerts())),
    }
}

/// Apply a command; returns `false` when the console should exit
fn apply(stream: &AlertStream, command: Command, mode: OutputMode) -> bool {
    match command {
        Command::DismissAlert(id) => match stream.dismiss_alert(&id) {
            Some(alert) => {
                info!("Dismissed alert {}: {}", id, alert.description);
                print_panel(stream, mode);
            }
            None => warn!("No alert with id {}", id),
        },
        Command::DismissNotification(id) => {
            if !stream.dismiss_notification(id) {
                warn!("No visible notification with id {}", id);
            }
        }
        Command::List => print_panel(stream, mode),
        Command::Quit => return false,
    }
    true
}

/// Run the console until ctrl-c, `q`, or end of input
pub async fn run(settings: Settings, mode: OutputMode) -> Result<(), SettingsError> {
    settings.validate()?;

    let mut stream = AlertStream::connect(settings.stream)?;
    let mut events = stream.subscribe();
    stream.open();
    info!("Subscribed at {}", stream.push_url());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(StreamEvent::Notified(notification)) => {
                    if mode == OutputMode::Text {
                        println!("{}", view::render_notification(&notification));
                    }
                }
                Ok(StreamEvent::AlertsChanged)
                | Ok(StreamEvent::SnapshotLoaded { .. })
                | Ok(StreamEvent::SnapshotFailed(_)) => print_panel(&stream, mode),
                Ok(StreamEvent::ConnectionChanged(state)) => {
                    debug!("Push connection is now {:?}", state);
                }
                Ok(StreamEvent::PushFailed(message)) => warn!("{}", message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Console fell behind by {} events", skipped);
                    print_panel(&stream, mode);
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(command) => {
                        if !apply(&stream, command, mode) {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("Unknown command: {}", line.trim()),
                },
                Ok(None) => {
                    debug!("Input closed, continuing until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    stream.close();
    Ok(())
}
