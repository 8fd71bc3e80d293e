//! Command-line entry point for filecast.
//!
//! Watches directory trees and pushes every file change to connected
//! browsers over a WebSocket.
//!
//! # Usage
//!
//! ```bash
//! filecast [OPTIONS] [COMMAND]
//!
//! # Watch two run directories and serve a dashboard bundle
//! filecast serve --root ./runs --root ./evals --static-dir ./dashboard/dist
//!
//! # Start from a config file, overriding the port
//! filecast --config filecast.json --port 9000 serve
//!
//! # Print the effective configuration as JSON
//! filecast --config filecast.json config
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use fc_core::Config;
use fc_server::Service;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Broadcast filesystem changes to WebSocket viewers.
///
/// Flags override values from the configuration file.
#[derive(Parser)]
#[command(name = "filecast", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute. Defaults to `serve`.
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "FILECAST_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory to watch recursively. Repeatable.
    #[arg(short, long = "root", global = true, value_name = "DIR")]
    roots: Vec<Utf8PathBuf>,

    /// Extra ignore pattern (`*suffix` or substring). Repeatable.
    #[arg(short, long = "ignore", global = true, value_name = "PATTERN")]
    ignore: Vec<String>,

    /// Interface to listen on.
    #[arg(long, global = true, env = "FILECAST_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, global = true, env = "FILECAST_PORT")]
    port: Option<u16>,

    /// Directory with the static dashboard bundle.
    #[arg(long, global = true, env = "FILECAST_STATIC_DIR")]
    static_dir: Option<Utf8PathBuf>,

    /// Exit if the watcher cannot start instead of serving without updates.
    #[arg(long, global = true)]
    require_watch: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Watch the roots and serve viewers until interrupted.
    Serve,

    /// Print the effective configuration as JSON and exit.
    Config,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose` and
/// `info` by default, with the HTTP stack and `notify` held at `warn`.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},hyper=warn,tower_http=warn,notify=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds the effective [`Config`]: file first, then flags on top.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the result is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    if !cli.roots.is_empty() {
        config.watch.roots.clone_from(&cli.roots);
    }
    config.watch.ignore.extend(cli.ignore.iter().cloned());
    if cli.require_watch {
        config.watch.required = true;
    }
    if let Some(host) = &cli.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.static_dir.is_some() {
        config.server.static_dir.clone_from(&cli.static_dir);
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs the service until Ctrl-C or SIGTERM.
///
/// On Unix, SIGHUP restarts the watcher on the configured roots.
async fn run_serve(config: Config) -> color_eyre::Result<()> {
    info!(
        roots = ?config.watch.roots,
        addr = %config.server.bind_address(),
        "Starting filecast"
    );

    let service = Service::start(config).await?;
    let listener = service.bind().await?;
    let mut server = service.serve(listener);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;

        loop {
            tokio::select! {
                result = &mut server => {
                    result??;
                    return Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, restarting watcher");
                    if let Err(e) = service.restart_watcher().await {
                        tracing::error!(error = %e, "Watcher restart failed");
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = &mut server => {
                result??;
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
            }
        }
    }

    service.shutdown().await;
    server.await??;
    Ok(())
}

/// Prints the effective configuration.
fn run_config(config: &Config) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to the requested command
    let config = build_config(&cli)?;
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_serve(config).await,
        Commands::Config => run_config(&config),
    }
}
