//! Page-count estimation for listings without a count endpoint
//!
//! The estimator only relies on the fact that every page before the boundary
//! page is full and every page after it is empty. It first grows a window
//! until the upper edge is known to be past the boundary, then binary searches
//! the window for the partially filled page.

use super::models::{EstimationResult, PER_PAGE, PageQuery};
use super::{ListingError, RepoPageSource};

/// Default estimate of the total number of repositories
pub const DEFAULT_ESTIMATE: u64 = 100_000;

/// Upper edge of the growth phase. Past this page the search continues with a
/// truncated window and the result is a lower bound.
pub const MAX_SEARCH_PAGE: u64 = 1 << 32;

/// Determines the total number of repositories and pages of a listing
///
/// `estimate` is a rough item count used to seed the search window
/// (`ceil(estimate / 100)` pages, at least 1).
///
/// # Algorithm
///
/// 1. Fetch the seed page; while it is full, double the seed and retry.
/// 2. Binary search `[1, seed]`: a full page moves `low` past `mid`, an empty
///    page moves `high` below `mid`, a partial page is the boundary and ends
///    the search.
/// 3. When the window closes without a partial page being observed, the
///    result is derived from the final `mid` and the size of the most recent
///    fetch. This is not a verified boundary and can over- or undercount when
///    the collection ends exactly on a page edge.
///
/// # Errors
///
/// Any failed page fetch aborts the estimation.
pub async fn estimate_page_count<S>(
    source: &S,
    base_url: &str,
    namespace: Option<&str>,
    estimate: u64,
) -> Result<EstimationResult, ListingError>
where
    S: RepoPageSource + ?Sized,
{
    let per_page = i64::from(PER_PAGE);
    let mut estimate_page_count = estimate.div_ceil(u64::from(PER_PAGE)).max(1);

    // grow until the probed page is no longer full
    loop {
        let query = PageQuery::new(base_url, estimate_page_count, namespace);
        let repos = source.fetch_page(&query).await?;
        if repos.len() != PER_PAGE as usize {
            break;
        }
        if estimate_page_count >= MAX_SEARCH_PAGE {
            tracing::warn!(
                "page {} is still full, searching below it; the count is a lower bound",
                estimate_page_count
            );
            break;
        }
        estimate_page_count = estimate_page_count.saturating_mul(2).min(MAX_SEARCH_PAGE);
        tracing::debug!("estimate_page_count: {}", estimate_page_count);
    }

    let mut low: i64 = 1;
    let mut high: i64 = estimate_page_count as i64;
    let mut mid = (low + high) / 2;
    let mut last_fetch_num_repos = per_page;

    while low < high {
        let query = PageQuery::new(base_url, mid as u64, namespace);
        let repos = source.fetch_page(&query).await?;
        let num_repos = repos.len() as i64;
        tracing::debug!(
            "repos.len: {}, mid: {}, low: {}, high: {}",
            num_repos,
            mid,
            low,
            high
        );
        last_fetch_num_repos = num_repos;

        if num_repos == per_page {
            low = mid + 1;
        } else if num_repos == 0 {
            high = mid - 1;
        } else {
            return Ok(EstimationResult {
                total_pages: mid,
                total: (mid - 1) * per_page + num_repos,
            });
        }
        mid = (low + high) / 2;
    }

    tracing::debug!(
        "no partial page observed, falling back to mid {} with {} repos on the last fetch",
        mid,
        last_fetch_num_repos
    );
    Ok(EstimationResult {
        total_pages: mid,
        total: (mid - 1) * per_page + last_fetch_num_repos,
    })
}
