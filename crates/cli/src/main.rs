mod config_commands;
mod replay_commands;
mod script;

use std::path::{Path, PathBuf};

use {
    anyhow::Result,
    clap::{Parser, Subcommand},
    courier_config::CourierConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier: reply dispatch for chat transports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./courier.toml and ~/.config/courier/).
    #[arg(long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch a scripted reply through a configured Telegram account.
    Replay(replay_commands::ReplayArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays machine-readable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the config from `path`, or discover it when no path is given.
pub(crate) fn load(path: Option<&Path>) -> Result<CourierConfig> {
    match path {
        Some(path) => courier_config::load_config(path),
        None => Ok(courier_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match cli.command {
        Commands::Replay(args) => {
            let config = load(cli.config.as_deref())?;
            replay_commands::handle_replay(args, config).await
        },
        Commands::Config { action } => config_commands::handle_config(action, cli.config),
    }
}
