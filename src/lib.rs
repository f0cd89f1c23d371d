//! gitmeta-proxy: a small HTTP proxy for Git ref advertisements and GitLab
//! repository listings
//!
//! This library provides:
//! - Remote ref listings over the Git smart-HTTP protocol, with tags resolved
//!   to their commits and `HEAD` resolved through the remote's default branch
//! - Concurrent fetching of contiguous GitLab project pages
//! - A page-count estimator for GitLab listings, which lack a count endpoint
//!
//! ## Usage
//!
//! This library can be used in several ways:
//! - As an HTTP server (`gitmeta serve`)
//! - From the terminal (`gitmeta-cli`)
//! - Directly as a Rust library
//!
//! ## State
//!
//! Nothing is cached or persisted. Each request fetches what it needs and
//! drops it once answered; only the outbound HTTP connection pool is shared.
//!
//! ```no_run
//! use gitmeta_proxy::gitmeta::repository_listing::{estimate_page_count, GitlabClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let gitlab = GitlabClient::new(reqwest::Client::new());
//! let result = estimate_page_count(&gitlab, "https://gitlab.com", Some("gitlab-org"), 1_000).await?;
//! println!("{} repositories over {} pages", result.total, result.total_pages);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gitmeta;
pub mod services;
pub mod transport;
