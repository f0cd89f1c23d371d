//! Runtime configuration shared by the server and CLI binaries

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Client;

use crate::gitmeta::repository_listing::DEFAULT_GITLAB_URL;

/// Default address of the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Settings the binaries gather from their command line
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// GitLab instance used when a request does not name one
    pub default_gitlab_url: String,

    /// Overall timeout for each outbound request. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            default_gitlab_url: DEFAULT_GITLAB_URL.to_string(),
            request_timeout: None,
        }
    }

    /// Builds the outbound HTTP client
    ///
    /// One client is shared by the Git and GitLab clients so they reuse the
    /// same connection pool. No response data is cached.
    pub fn build_http_client(&self) -> Result<Client, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}
