//! Domain models for paginated repository listings
//!
//! These types are provider-agnostic. Provider clients map their own wire
//! structures into [`RepoSummary`] so the estimator and the bulk fetcher never
//! see vendor specific fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed page size used by the estimator and the bulk fetcher.
///
/// GitLab caps `per_page` at 100, so a page with fewer items marks the end of
/// the collection.
pub const PER_PAGE: u32 = 100;

/// Default instance queried when the caller does not name one.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Normalized summary of one repository in a listing
///
/// Timestamps are parsed, not passed through: they serialize as RFC 3339 in
/// UTC with only as many fractional digits as needed, so GitLab's
/// `2020-01-02T03:04:05.000Z` is returned as `2020-01-02T03:04:05Z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    /// Namespace-qualified path (e.g. "group/subgroup/project")
    pub name: String,

    /// Identifier assigned by the source instance
    pub id: u64,

    /// Canonical web URL of the repository
    pub url: String,

    /// When the repository was created
    pub created_at: DateTime<Utc>,

    /// Last activity reported by the source
    pub updated_at: DateTime<Utc>,
}

/// Parameters that fully determine one page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Base URL of the instance, e.g. "https://gitlab.com"
    pub base_url: String,

    /// Page index, starting at 1
    pub page: u64,

    /// Page size
    pub per_page: u32,

    /// Optional namespace filter. `None` and `Some("")` are equivalent.
    pub namespace: Option<String>,
}

impl PageQuery {
    /// Builds a query with the fixed estimation page size
    pub fn new(base_url: &str, page: u64, namespace: Option<&str>) -> Self {
        Self {
            base_url: base_url.to_string(),
            page,
            per_page: PER_PAGE,
            namespace: namespace.map(String::from),
        }
    }

    /// Returns the namespace filter, treating an empty string as absent
    pub fn namespace_filter(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}

/// Outcome of the page-count estimation
///
/// Both fields are signed: the fallback arithmetic of the estimator can yield
/// zero or negative values for an empty collection and is reported as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub total_pages: i64,
    pub total: i64,
}
