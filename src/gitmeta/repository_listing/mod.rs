//! Paginated repository listings
//!
//! This module provides:
//! - [`RepoPageSource`], the seam over a single page fetch
//! - [`fetch_many`], a concurrent fetch of a contiguous page range
//! - [`estimator::estimate_page_count`], the page-count search
//!
//! The GitLab implementation of [`RepoPageSource`] lives in
//! [`providers::gitlab`].

pub mod estimator;
pub mod models;
pub mod providers;

use async_trait::async_trait;

use crate::gitmeta::concurrency::join_all_or_nothing;

pub use estimator::estimate_page_count;
pub use models::{DEFAULT_GITLAB_URL, EstimationResult, PER_PAGE, PageQuery, RepoSummary};
pub use providers::gitlab::GitlabClient;

/// Errors raised while fetching repository pages
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// The request could not be sent or the connection failed
    #[error("Failed to fetch repositories page {page}: {message}")]
    Transport { page: u64, message: String },

    /// The instance answered with a non-success status
    #[error("GitLab API error {status} on page {page}: {body}")]
    Status { page: u64, status: u16, body: String },

    /// The body could not be decoded as a list of projects
    #[error("Failed to parse repositories page {page}: {message}")]
    Decode { page: u64, message: String },
}

/// A source of repository pages
///
/// Implementations perform exactly one outbound request per call and never
/// retry. Errors propagate to the caller unchanged.
#[async_trait]
pub trait RepoPageSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<RepoSummary>, ListingError>;
}

/// Fetches `num_pages` consecutive pages starting at `start_page`
///
/// All pages are requested concurrently. The result is the concatenation of
/// the pages in ascending page order, independent of completion order. Any
/// failing page fails the whole batch.
///
/// One query is built per page up front, so callers bound `num_pages`
/// (the services layer caps it at `MAX_PAGE_LIMIT`).
pub async fn fetch_many<S>(
    source: &S,
    base_url: &str,
    namespace: Option<&str>,
    start_page: u64,
    num_pages: u64,
) -> Result<Vec<RepoSummary>, ListingError>
where
    S: RepoPageSource + ?Sized,
{
    tracing::debug!(
        "fetching {} pages starting at {} from {}",
        num_pages,
        start_page,
        base_url
    );

    let queries: Vec<PageQuery> = (start_page..start_page.saturating_add(num_pages))
        .map(|page| PageQuery::new(base_url, page, namespace))
        .collect();

    let pages = join_all_or_nothing(queries.iter().map(|query| source.fetch_page(query))).await?;

    Ok(pages.into_iter().flatten().collect())
}
