use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::{self, EnvFilter};

use gitmeta_proxy::config::ServerConfig;
use gitmeta_proxy::gitmeta::remote_refs::{GitRefFetcher, SmartHttpClient};
use gitmeta_proxy::gitmeta::repository_listing::estimator::DEFAULT_ESTIMATE;
use gitmeta_proxy::gitmeta::repository_listing::{DEFAULT_GITLAB_URL, GitlabClient};
use gitmeta_proxy::services::{
    self,
    params::{DEFAULT_PAGE_LIMIT, DEFAULT_START_PAGE, RepoCountParams, RepoListParams},
};

#[derive(Parser)]
#[command(author, version = "0.1.0", about = "gitmeta CLI for Git ref and GitLab listing lookups", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Timeout in seconds for each outbound request
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List refs below a prefix for up to 9 repositories
    Refs {
        /// Repository URLs
        #[arg(
            required = true,
            help = "Repository URLs - 'https://host/group/repo.git' or 'host/group/repo'; the scheme and '.git' suffix are added when missing"
        )]
        urls: Vec<String>,

        /// Ref prefix to list (default is 'refs/tags/')
        #[arg(short, long)]
        prefix: Option<String>,
    },
    /// Resolve tag commits and HEAD for up to 100 repositories
    Meta {
        /// Repository URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Fetch a range of GitLab project pages
    Repos {
        /// GitLab instance base URL
        #[arg(long, default_value = DEFAULT_GITLAB_URL)]
        url: String,

        /// Namespace path to filter by
        #[arg(short, long)]
        namespace: Option<String>,

        /// First page to fetch
        #[arg(long, default_value_t = DEFAULT_START_PAGE)]
        start: u64,

        /// Number of pages to fetch
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u64,
    },
    /// Estimate the number of GitLab projects and pages
    Count {
        /// GitLab instance base URL
        #[arg(long, default_value = DEFAULT_GITLAB_URL)]
        url: String,

        /// Namespace path to filter by
        #[arg(short, long)]
        namespace: Option<String>,

        /// Rough number of projects, seeds the search
        #[arg(long, default_value_t = DEFAULT_ESTIMATE)]
        estimate: u64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // Keep stdout for JSON output
        .with_target(false)
        .with_ansi(false)
        .init();

    let mut config = ServerConfig::default();
    config.request_timeout = cli.timeout_secs.map(Duration::from_secs);
    let client = config.build_http_client()?;

    match cli.command {
        Commands::Refs { urls, prefix } => {
            let fetcher = GitRefFetcher::new(SmartHttpClient::new(client));
            let report = services::list_server_refs(&fetcher, &urls, prefix.as_deref()).await?;
            print_json(&report)
        }
        Commands::Meta { urls } => {
            let fetcher = GitRefFetcher::new(SmartHttpClient::new(client));
            let report = services::fetch_refs(&fetcher, &urls).await?;
            print_json(&report)
        }
        Commands::Repos {
            url,
            namespace,
            start,
            limit,
        } => {
            let gitlab = GitlabClient::new(client);
            let params = RepoListParams::new(&url, namespace.as_deref(), start, limit)?;
            let repos = services::fetch_gitlab_repos(&gitlab, &params).await?;
            print_json(&repos)
        }
        Commands::Count {
            url,
            namespace,
            estimate,
        } => {
            let gitlab = GitlabClient::new(client);
            let params = RepoCountParams {
                base_url: url,
                namespace,
                estimate,
            };
            let result = services::count_gitlab_repos(&gitlab, &params).await?;
            print_json(&result)
        }
    }
}
