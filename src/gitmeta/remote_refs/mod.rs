//! Remote Git ref listings
//!
//! This module provides:
//! - [`GitRemoteClient`], the seam over the Git transport
//! - [`GitRefFetcher`], which fans a list of repository URLs out to the
//!   client and collects successes and failures per URL
//! - [`normalize_url`], the URL defaults applied before dispatch
//!
//! Two views of a remote are offered:
//!
//! - [`GitRefFetcher::fetch_refs`] resolves tags to their commits and adds a
//!   synthesized `HEAD` entry.
//! - [`GitRefFetcher::list_server_refs`] lists every advertised ref under a
//!   prefix with its peeled id attached.

pub mod models;
pub mod smart_http;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;

use crate::gitmeta::concurrency::join_isolated;

pub use models::{AdvertisedRef, RefFetchReport, RefMap, RemoteInfo, ServerRef};
pub use smart_http::{GitRemoteError, SmartHttpClient};

/// Prefix listed by [`GitRefFetcher::list_server_refs`] when none is given
pub const DEFAULT_REF_PREFIX: &str = "refs/tags/";

/// Upper bound of URLs accepted by [`GitRefFetcher::fetch_refs`]
pub const MAX_FETCH_URLS: usize = 100;

/// Upper bound of URLs accepted by [`GitRefFetcher::list_server_refs`]
pub const MAX_LIST_URLS: usize = 9;

/// Message used when an error carries no usable text
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

const TAGS_PREFIX: &str = "refs/tags/";

/// Request-shape errors, raised before any network call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefRequestError {
    #[error("Missing required parameter \"url\"")]
    MissingUrl,

    #[error("Too many URLs provided. Maximum is {max}.")]
    TooManyUrls { max: usize },

    #[error("Missing required parameters. Both \"url\" and \"prefix\" are required.")]
    EmptyUrl,
}

/// Transport to a remote Git repository
///
/// Given a repository URL, returns the remote's ref advertisement.
#[async_trait]
pub trait GitRemoteClient: Send + Sync {
    async fn get_remote_info(&self, url: &str) -> Result<RemoteInfo, GitRemoteError>;
}

#[async_trait]
impl<C: GitRemoteClient + ?Sized> GitRemoteClient for Arc<C> {
    async fn get_remote_info(&self, url: &str) -> Result<RemoteInfo, GitRemoteError> {
        (**self).get_remote_info(url).await
    }
}

/// Applies the URL defaults: `.git` suffix and `https://` scheme
///
/// # Examples
///
/// ```
/// use gitmeta_proxy::gitmeta::remote_refs::normalize_url;
///
/// assert_eq!(normalize_url("github.com/user/repo"), "https://github.com/user/repo.git");
/// assert_eq!(normalize_url("http://host/repo.git"), "http://host/repo.git");
/// ```
pub fn normalize_url(url: &str) -> String {
    let mut normalized = url.to_string();
    if !normalized.ends_with(".git") {
        normalized.push_str(".git");
    }
    if !normalized.starts_with("http") {
        normalized = format!("https://{}", normalized);
    }
    normalized
}

/// Builds the tag → commit map of a remote, plus `HEAD`
///
/// Tags are keyed by their name below `refs/tags/`. A peeled entry
/// (`<tag>^{}`) always replaces the tag object id, whatever the advertisement
/// order. `HEAD` is the id of the ref the remote's `HEAD` symref points to and
/// is omitted when there is no symref or its target is not advertised.
pub fn resolve_refs(info: &RemoteInfo) -> RefMap {
    let mut refs = RefMap::new();

    if let Some(oid) = info.head.as_deref().and_then(|target| info.oid_of(target)) {
        refs.insert("HEAD".to_string(), oid.to_string());
    }

    let mut peeled = BTreeMap::new();
    for advertised in &info.refs {
        let Some(tag) = advertised.name.strip_prefix(TAGS_PREFIX) else {
            continue;
        };
        match tag.strip_suffix(models::PEELED_SUFFIX) {
            Some(base) => {
                peeled.insert(base.to_string(), advertised.oid.clone());
            }
            None => {
                refs.entry(tag.to_string())
                    .or_insert_with(|| advertised.oid.clone());
            }
        }
    }
    refs.extend(peeled);

    refs
}

/// Lists advertised refs below `prefix`, folding peeled entries into their tag
pub fn filter_server_refs(info: &RemoteInfo, prefix: &str) -> Vec<ServerRef> {
    let peeled: BTreeMap<&str, &str> = info
        .refs
        .iter()
        .filter_map(|r| r.peeled_base().map(|base| (base, r.oid.as_str())))
        .collect();

    info.refs
        .iter()
        .filter(|r| r.peeled_base().is_none() && r.name.starts_with(prefix))
        .map(|r| ServerRef {
            ref_name: r.name.clone(),
            oid: r.oid.clone(),
            peeled: peeled.get(r.name.as_str()).map(|oid| oid.to_string()),
        })
        .collect()
}

/// Turns an error into the message reported for its URL
pub fn error_message(err: &impl Display) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNEXPECTED_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

/// Fans ref requests out to a [`GitRemoteClient`]
#[derive(Debug, Clone)]
pub struct GitRefFetcher<C> {
    client: C,
}

impl<C: GitRemoteClient> GitRefFetcher<C> {
    pub fn new(client: C) -> Self {
        GitRefFetcher { client }
    }

    /// Fetches tag and `HEAD` ids for 1 to 100 repositories
    ///
    /// URLs are normalized with [`normalize_url`] and the report is keyed by
    /// the normalized URL. Remotes are queried concurrently and a failing
    /// remote only lands in `errors`.
    pub async fn fetch_refs(
        &self,
        urls: &[String],
    ) -> Result<RefFetchReport<RefMap>, RefRequestError> {
        validate_url_count(urls, MAX_FETCH_URLS)?;

        let targets: BTreeMap<String, String> = urls
            .iter()
            .map(|url| {
                let normalized = normalize_url(url);
                (normalized.clone(), normalized)
            })
            .collect();

        Ok(self
            .dispatch(targets, |info| resolve_refs(&info))
            .await)
    }

    /// Lists refs below `prefix` for 1 to 9 repositories
    ///
    /// An empty prefix falls back to [`DEFAULT_REF_PREFIX`]. Each URL is
    /// normalized before dispatch, but the report is keyed by the URL exactly
    /// as given.
    pub async fn list_server_refs(
        &self,
        urls: &[String],
        prefix: Option<&str>,
    ) -> Result<RefFetchReport<Vec<ServerRef>>, RefRequestError> {
        validate_url_count(urls, MAX_LIST_URLS)?;
        if urls.iter().any(|url| url.trim().is_empty()) {
            return Err(RefRequestError::EmptyUrl);
        }

        let prefix = prefix
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_REF_PREFIX)
            .to_string();

        let targets: BTreeMap<String, String> = urls
            .iter()
            .map(|url| (url.clone(), normalize_url(url)))
            .collect();

        Ok(self
            .dispatch(targets, move |info| filter_server_refs(&info, &prefix))
            .await)
    }

    async fn dispatch<T, F>(
        &self,
        targets: BTreeMap<String, String>,
        transform: F,
    ) -> RefFetchReport<T>
    where
        F: Fn(RemoteInfo) -> T,
    {
        let keyed = targets.into_iter().map(|(key, url)| {
            let client = &self.client;
            let fut = async move {
                tracing::debug!(%url, "fetching remote refs");
                client.get_remote_info(&url).await.inspect_err(|err| {
                    tracing::warn!(%url, "failed to fetch remote refs: {}", err);
                })
            };
            (key, fut)
        });

        let (successes, failures) = join_isolated(keyed).await;

        RefFetchReport {
            data: successes
                .into_iter()
                .map(|(key, info)| (key, transform(info)))
                .collect(),
            errors: failures
                .into_iter()
                .map(|(key, err)| (key, error_message(&err)))
                .collect(),
        }
    }
}

fn validate_url_count(urls: &[String], max: usize) -> Result<(), RefRequestError> {
    if urls.is_empty() {
        return Err(RefRequestError::MissingUrl);
    }
    if urls.len() > max {
        return Err(RefRequestError::TooManyUrls { max });
    }
    Ok(())
}
