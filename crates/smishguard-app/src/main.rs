//! SmishGuard - passive SMS phishing monitoring.
//!
//! Command-line front end:
//! - One-off scans and scan history
//! - Monitoring preference (enable/disable/status)
//! - `monitor run`: analyze notifications read from stdin until it closes

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smishguard_app::source::{IdleSource, LineSource};
use smishguard_app::{report, AppContext, Settings};
use smishguard_core::{PlatformKind, DEFAULT_LANGUAGE};
use smishguard_monitor::{MonitorController, MonitorError};

/// How often `monitor run` checks whether queued work has finished.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// SmishGuard - detect phishing in incoming SMS messages
#[derive(Parser, Debug)]
#[command(name = "smishguard", version, about)]
struct Args {
    /// Base URL of the phishing classifier
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Language sent with each analysis request
    #[arg(long, global = true, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// How notifications reach the app
    #[arg(long, global = true, value_enum, default_value_t = PlatformArg::Standard)]
    platform: PlatformArg,

    /// Database file (defaults to the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Enable debug logging (also logs to the console)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a message now and record the verdict
    Scan {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Show recent scans, newest first
    History {
        /// Maximum number of entries to show
        #[arg(long)]
        limit: Option<usize>,

        /// Print full records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show lifetime scan counters
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete scan history (counters are kept)
    ClearHistory,

    /// Passive monitoring
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum MonitorAction {
    /// Turn monitoring on
    Enable,
    /// Turn monitoring off
    Disable,
    /// Show monitoring and permission status
    Status,
    /// Monitor notifications read from stdin, one per line (JSON or plain text)
    Run,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PlatformArg {
    /// Notifications are filtered for SMS markers
    Standard,
    /// Notifications come from a dedicated SMS listener
    NotificationListener,
}

impl From<PlatformArg> for PlatformKind {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Standard => PlatformKind::Standard,
            PlatformArg::NotificationListener => PlatformKind::NotificationListener,
        }
    }
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            api_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            language: self.language.clone(),
            platform: self.platform.into(),
            db_path: self.db.clone(),
        }
    }
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "smishguard", "smishguard").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smishguard={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("smishguard")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                // Console output goes to stderr; stdout carries command output
                if args.debug {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

async fn scan(ctx: &AppContext, message: &[String]) -> anyhow::Result<()> {
    let message = message.join(" ");
    let record = ctx
        .scanner
        .scan_text(&message, &ctx.settings.language)
        .await
        .map_err(|e| anyhow::anyhow!("Analysis failed: {}", e.reason()))?;

    println!("{}", report::format_record(&record));
    Ok(())
}

fn history(ctx: &AppContext, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let mut history = ctx.ledger.history();
    if let Some(limit) = limit {
        history.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else if history.is_empty() {
        println!("No scans yet");
    } else {
        for record in &history {
            println!("{}", report::format_history_line(record));
        }
    }
    Ok(())
}

fn stats(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let stats = ctx.ledger.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", report::format_stats(&stats));
    }
    Ok(())
}

/// Reports a blocked start. The preference stays saved.
fn explain_denied(controller: &MonitorController, err: MonitorError) -> anyhow::Result<()> {
    match err.directive() {
        Some(directive) => {
            println!("Monitoring enabled, waiting for permission.");
            println!("{}", directive);
            if let Err(e) = controller.open_settings(directive) {
                tracing::warn!("Could not open settings: {}", e);
            }
            Ok(())
        }
        None => Err(err.into()),
    }
}

async fn monitor(ctx: &AppContext, action: MonitorAction) -> anyhow::Result<()> {
    match action {
        MonitorAction::Enable => {
            let controller = ctx.controller(Arc::new(IdleSource));
            match controller.enable_monitoring() {
                Ok(_) => {
                    println!("Monitoring enabled. Run `smishguard monitor run` to process notifications.");
                    Ok(())
                }
                Err(e) => explain_denied(&controller, e),
            }
        }
        MonitorAction::Disable => {
            let controller = ctx.controller(Arc::new(IdleSource));
            controller.disable_monitoring()?;
            println!("Monitoring disabled");
            Ok(())
        }
        MonitorAction::Status => {
            let controller = ctx.controller(Arc::new(IdleSource));
            let status = controller.refresh_status();
            println!("{}", report::format_status(&status, controller.platform()));
            Ok(())
        }
        MonitorAction::Run => run_monitor(ctx).await,
    }
}

async fn run_monitor(ctx: &AppContext) -> anyhow::Result<()> {
    let source = Arc::new(LineSource::new());
    let controller = ctx.controller(source.clone());

    let status = controller.initialize();
    if !controller.is_monitoring() {
        if !status.monitoring_enabled {
            println!("Monitoring is disabled. Run `smishguard monitor enable` first.");
            return Ok(());
        }
        // Ask again so the user gets the prompt and the directive
        if let Err(e) = controller.start_monitoring() {
            return explain_denied(&controller, e);
        }
    }

    tracing::info!("Monitoring stdin for notifications");
    source.spawn_reader(std::io::stdin());

    tokio::select! {
        _ = source.closed() => {
            // Let queued notifications and running analyses finish
            while controller.events_seen() < source.delivered() || controller.in_flight() > 0 {
                tokio::time::sleep(DRAIN_POLL).await;
            }
            tracing::info!("Input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    controller.stop_monitoring();

    let stats = ctx.ledger.stats();
    println!("{}", report::format_stats(&stats));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    tracing::info!("Starting SmishGuard...");
    tracing::debug!("Args: {:?}", args);

    let ctx = AppContext::open(args.settings())?;

    match &args.command {
        Command::Scan { message } => scan(&ctx, message).await?,
        Command::History { limit, json } => history(&ctx, *limit, *json)?,
        Command::Stats { json } => stats(&ctx, *json)?,
        Command::ClearHistory => {
            ctx.ledger.clear();
            println!("History cleared");
        }
        Command::Monitor { action } => monitor(&ctx, *action).await?,
    }

    tracing::info!("SmishGuard shutting down");
    Ok(())
}
