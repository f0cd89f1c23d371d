//! Request-level operations shared by the HTTP façade and the CLI
//!
//! Every function here takes its collaborators as parameters and keeps no
//! state, so the same call works against the real network clients or a stub.

pub mod params;

use crate::gitmeta::remote_refs::{
    GitRefFetcher, GitRemoteClient, RefFetchReport, RefMap, RefRequestError, ServerRef,
};
use crate::gitmeta::repository_listing::{
    self, EstimationResult, ListingError, RepoPageSource, RepoSummary,
};
use params::{RepoCountParams, RepoListParams};

/// Errors surfaced by the service functions
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The URL list of a ref request is out of bounds or malformed
    #[error(transparent)]
    InvalidRequest(#[from] RefRequestError),

    /// A scalar parameter could not be interpreted
    #[error("Invalid value {value:?} for parameter \"{name}\": {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A repository page could not be fetched
    #[error(transparent)]
    Listing(#[from] ListingError),
}

impl ServiceError {
    /// Whether the request was rejected before any network call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidRequest(_) | ServiceError::InvalidParameter { .. }
        )
    }
}

/// Lists refs below `prefix` for each URL, failures isolated per URL
///
/// # Parameters
///
/// * `fetcher` - The ref fetcher wrapping the Git transport
/// * `urls` - 1 to 9 repository URLs, scheme and `.git` suffix optional
/// * `prefix` - Ref prefix, `refs/tags/` when `None` or empty
///
/// # Errors
///
/// Only request-shape errors. Per-URL transport failures are reported in the
/// `errors` map of the returned report.
pub async fn list_server_refs<C: GitRemoteClient>(
    fetcher: &GitRefFetcher<C>,
    urls: &[String],
    prefix: Option<&str>,
) -> Result<RefFetchReport<Vec<ServerRef>>, ServiceError> {
    let report = fetcher.list_server_refs(urls, prefix).await?;
    tracing::info!(
        "listed refs for {} urls ({} failed)",
        report.data.len(),
        report.errors.len()
    );
    Ok(report)
}

/// Resolves tag commits and `HEAD` for each URL, failures isolated per URL
pub async fn fetch_refs<C: GitRemoteClient>(
    fetcher: &GitRefFetcher<C>,
    urls: &[String],
) -> Result<RefFetchReport<RefMap>, ServiceError> {
    let report = fetcher.fetch_refs(urls).await?;
    tracing::info!(
        "resolved refs for {} urls ({} failed)",
        report.data.len(),
        report.errors.len()
    );
    Ok(report)
}

/// Fetches `params.limit` pages of repositories starting at `params.start`
///
/// Pages are fetched concurrently and returned in page order. Any failing
/// page fails the whole listing. The page range is validated before any
/// request is made.
pub async fn fetch_gitlab_repos<S: RepoPageSource + ?Sized>(
    source: &S,
    params: &RepoListParams,
) -> Result<Vec<RepoSummary>, ServiceError> {
    params.validate()?;
    let repos = repository_listing::fetch_many(
        source,
        &params.base_url,
        params.namespace.as_deref(),
        params.start,
        params.limit,
    )
    .await?;
    tracing::info!(
        "fetched {} repositories from {} (pages {}..{})",
        repos.len(),
        params.base_url,
        params.start,
        params.start + params.limit
    );
    Ok(repos)
}

/// Estimates the total number of repositories and pages
pub async fn count_gitlab_repos<S: RepoPageSource + ?Sized>(
    source: &S,
    params: &RepoCountParams,
) -> Result<EstimationResult, ServiceError> {
    let result = repository_listing::estimate_page_count(
        source,
        &params.base_url,
        params.namespace.as_deref(),
        params.estimate,
    )
    .await?;
    tracing::info!(
        "{} has {} repositories over {} pages",
        params.base_url,
        result.total,
        result.total_pages
    );
    Ok(result)
}
