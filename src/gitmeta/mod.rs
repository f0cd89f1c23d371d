//! Git metadata sources proxied by this crate
//!
//! This module provides:
//! - Remote ref listings over the Git smart-HTTP protocol ([`remote_refs`])
//! - Paginated GitLab repository listings and the page-count estimator
//!   ([`repository_listing`])
//! - The join combinators both of them fan out with ([`concurrency`])
//!
//! Nothing here keeps state between calls. Every operation takes its
//! collaborators as arguments, which is what lets the tests swap the network
//! clients for in-memory stubs.

pub mod concurrency;
pub mod remote_refs;
pub mod repository_listing;

pub use remote_refs::{GitRefFetcher, GitRemoteClient, SmartHttpClient};
pub use repository_listing::{GitlabClient, RepoPageSource};
