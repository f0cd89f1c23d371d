//! Parameter types for the service functions
//!
//! The HTTP façade builds these from a raw query string via [`QueryParams`];
//! the CLI builds them straight from its arguments.

use std::str::FromStr;

use url::form_urlencoded;

use super::ServiceError;
use crate::gitmeta::repository_listing::estimator::DEFAULT_ESTIMATE;

/// Default first page of a bulk listing
pub const DEFAULT_START_PAGE: u64 = 1;

/// Default number of pages of a bulk listing
pub const DEFAULT_PAGE_LIMIT: u64 = 50;

/// Upper bound of pages fetched by one bulk listing
pub const MAX_PAGE_LIMIT: u64 = 1_000;

/// Parameters for a bulk repository listing
///
/// # Examples
///
/// ```
/// use gitmeta_proxy::services::params::RepoListParams;
///
/// let params = RepoListParams::new("https://gitlab.com", Some("gitlab-org"), 1, 5).unwrap();
/// assert_eq!(params.limit, 5);
///
/// assert!(RepoListParams::new("https://gitlab.com", None, 0, 5).is_err());
/// assert!(RepoListParams::new("https://gitlab.com", None, 1, 1_000_000).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoListParams {
    /// Base URL of the GitLab instance
    pub base_url: String,

    /// Optional namespace filter
    pub namespace: Option<String>,

    /// First page to fetch (1-based)
    pub start: u64,

    /// Number of pages to fetch
    pub limit: u64,
}

impl RepoListParams {
    /// Builds validated listing parameters
    ///
    /// See [`RepoListParams::validate`] for the accepted ranges.
    pub fn new(
        base_url: &str,
        namespace: Option<&str>,
        start: u64,
        limit: u64,
    ) -> Result<Self, ServiceError> {
        let params = Self {
            base_url: base_url.to_string(),
            namespace: namespace.map(String::from),
            start,
            limit,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reads `url`, `namespace`, `start` and `limit` from a query
    ///
    /// Missing or empty values fall back to their defaults. A non-numeric
    /// `start`/`limit` is rejected, as is anything [`RepoListParams::validate`]
    /// rejects.
    pub fn from_query(query: &QueryParams, default_base_url: &str) -> Result<Self, ServiceError> {
        Self::new(
            &query.value_or("url", default_base_url),
            query.value("namespace"),
            query.number("start", DEFAULT_START_PAGE)?,
            query.number("limit", DEFAULT_PAGE_LIMIT)?,
        )
    }

    /// Checks the page range before any page is requested
    ///
    /// `start` must be at least 1, `limit` at most [`MAX_PAGE_LIMIT`], and the
    /// last page must be representable.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.start == 0 {
            return Err(ServiceError::InvalidParameter {
                name: "start",
                value: self.start.to_string(),
                reason: "pages start at 1".to_string(),
            });
        }
        if self.limit > MAX_PAGE_LIMIT {
            return Err(ServiceError::InvalidParameter {
                name: "limit",
                value: self.limit.to_string(),
                reason: format!("at most {} pages can be fetched at once", MAX_PAGE_LIMIT),
            });
        }
        if self.start.checked_add(self.limit).is_none() {
            return Err(ServiceError::InvalidParameter {
                name: "start",
                value: self.start.to_string(),
                reason: format!("page range overflows with limit {}", self.limit),
            });
        }
        Ok(())
    }
}

/// Parameters for a page-count estimation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCountParams {
    /// Base URL of the GitLab instance
    pub base_url: String,

    /// Optional namespace filter
    pub namespace: Option<String>,

    /// Rough number of repositories, seeds the search window
    pub estimate: u64,
}

impl RepoCountParams {
    /// Reads `url`, `namespace` and `estimate` from a query
    pub fn from_query(query: &QueryParams, default_base_url: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            base_url: query.value_or("url", default_base_url),
            namespace: query.value("namespace").map(String::from),
            estimate: query.number("estimate", DEFAULT_ESTIMATE)?,
        })
    }
}

/// Decoded `application/x-www-form-urlencoded` query string
///
/// Keeps every pair in order so repeated keys such as `url` survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|raw| form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// All values of a repeated key, in query order
    pub fn all(&self, name: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// First value of a key, or `None` when the key is missing or its first
    /// value is empty
    pub fn value(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    fn value_or(&self, name: &str, default: &str) -> String {
        self.value(name).unwrap_or(default).to_string()
    }

    fn number<T>(&self, name: &'static str, default: T) -> Result<T, ServiceError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.value(name) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ServiceError::InvalidParameter {
                    name,
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}
