//! feedback-relay: inbound webhook relay for plugin feedback

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedback_relay::{build_app, AppState, RelayConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "feedback-relay")]
#[command(version)]
#[command(about = "Relay plugin feedback submissions to a chat webhook")]
struct Cli {
    /// Configuration file path (.hcl)
    #[arg(short, long, env = "FEEDBACK_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("feedback_relay={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (mut config, _config_path) = feedback_relay::config::load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn serve(config: RelayConfig) -> Result<()> {
    let state = AppState::from_config(&config).context("Failed to build relay state")?;
    let app = build_app(state, &config.server.cors_origins);

    let addr: std::net::SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

    tracing::info!(%addr, "Feedback relay listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down...");
    Ok(())
}

fn show_config(config: Option<&RelayConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let hcl = hcl::to_string(&config)?;
    println!("{}", hcl);
    Ok(())
}
