use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{self, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gitmeta_proxy::config::{DEFAULT_BIND_ADDR, ServerConfig};
use gitmeta_proxy::gitmeta::repository_listing::DEFAULT_GITLAB_URL;
use gitmeta_proxy::transport::HttpServerApp;

#[derive(Parser)]
#[command(author, version = "0.1.0", about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP proxy
    Serve {
        /// Address to bind the HTTP server to
        #[arg(short, long, default_value = DEFAULT_BIND_ADDR)]
        address: String,

        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,

        /// GitLab instance used when a request does not pass `url`
        #[arg(long, default_value = DEFAULT_GITLAB_URL)]
        gitlab_url: String,

        /// Timeout in seconds for each outbound request
        /// Requests wait indefinitely if not specified
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            address,
            debug,
            gitlab_url,
            timeout_secs,
        } => run_http_server(address, debug, gitlab_url, timeout_secs).await,
    }
}

async fn run_http_server(
    address: String,
    debug: bool,
    gitlab_url: String,
    timeout_secs: Option<u64>,
) -> Result<()> {
    // Setup tracing
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},{}", level, env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false)) // Disable ANSI color codes
        .init();

    // Parse socket address
    let addr: SocketAddr = address.parse()?;

    let mut config = ServerConfig::new(addr);
    config.default_gitlab_url = gitlab_url;
    config.request_timeout = timeout_secs.map(Duration::from_secs);

    tracing::info!("Access the proxy at http://{}/", addr);
    tracing::info!("Default GitLab instance: {}", config.default_gitlab_url);
    if let Some(timeout) = config.request_timeout {
        tracing::info!("Outbound requests time out after {:?}", timeout);
    }

    let app = HttpServerApp::new(&config)?;
    app.serve().await?;

    Ok(())
}
