use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use casepilot::channels::web::{GatewayState, start_server};
use casepilot::config::Config;
use casepilot::db::Database;
use casepilot::db::memory::MemoryBackend;
use casepilot::practice::seed::seed_store;
use casepilot::settings::Settings;

const DEFAULT_LOG_FILTER: &str = "casepilot=info,tower_http=info";

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Case management backend for small law firms.
#[derive(Parser)]
#[command(name = "casepilot", version, about, long_about = None)]
struct Cli {
    /// TOML settings file.
    #[arg(long, global = true, env = "CASEPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Start with an empty store.
    #[arg(long, global = true)]
    no_seed: bool,

    #[arg(
        long,
        global = true,
        env = "CASEPILOT_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Print the resolved configuration and exit.
    Config,
}

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_format);

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    let config = Config::resolve(&settings).context("resolving configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Command::Serve => serve(config, cli.no_seed).await,
    }
}

async fn serve(config: Config, no_seed: bool) -> anyhow::Result<()> {
    let store: Arc<dyn Database> = Arc::new(MemoryBackend::new());
    if config.store.seed && !no_seed {
        seed_store(store.as_ref())
            .await
            .context("loading seed data")?;
    } else {
        tracing::info!("Seed data disabled, starting with an empty store");
    }

    let addr = config.gateway.bind_addr();
    let state = Arc::new(GatewayState::new(store, &config));
    let bound = start_server(addr, Arc::clone(&state)).await?;
    tracing::info!(
        %bound,
        backend = state.store.backend_name(),
        latency_ms = config.gateway.latency.as_millis() as u64,
        enforce_roles = config.gateway.enforce_roles,
        "Casepilot ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("Shutdown requested");
    state.shutdown().await;
    tracing::info!("Web gateway stopped");
    Ok(())
}
