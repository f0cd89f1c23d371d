use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::gitmeta::repository_listing::models::{PageQuery, RepoSummary};
use crate::gitmeta::repository_listing::{ListingError, RepoPageSource};

const USER_AGENT: &str = concat!("gitmeta-proxy/", env!("CARGO_PKG_VERSION"));

/// GitLab-specific project item returned by `GET /api/v4/projects`
///
/// Only the fields that feed [`RepoSummary`] are decoded; GitLab sends many
/// more which serde skips.
#[derive(Debug, Deserialize)]
struct GitlabProject {
    id: u64,
    path_with_namespace: String,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    http_url_to_repo: Option<String>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl From<GitlabProject> for RepoSummary {
    fn from(project: GitlabProject) -> Self {
        let url = project
            .web_url
            .filter(|url| !url.is_empty())
            .or(project.http_url_to_repo)
            .unwrap_or_default();

        RepoSummary {
            name: project.path_with_namespace,
            id: project.id,
            url,
            created_at: project.created_at,
            updated_at: project.last_activity_at,
        }
    }
}

/// Client for the GitLab projects listing API
#[derive(Debug, Clone)]
pub struct GitlabClient {
    client: Client,
}

impl GitlabClient {
    pub fn new(client: Client) -> Self {
        GitlabClient { client }
    }

    /// Constructs the projects listing URL for one page
    ///
    /// ```text
    /// <base>/api/v4/projects?page=<page>&per_page=<per_page>&statistics=true[&namespace_path=<ns>]
    /// ```
    ///
    /// A trailing slash on the base URL is dropped and the namespace is URL
    /// encoded. An empty namespace is omitted.
    fn construct_projects_url(query: &PageQuery) -> String {
        let mut url = format!(
            "{}/api/v4/projects?page={}&per_page={}&statistics=true",
            query.base_url.trim_end_matches('/'),
            query.page,
            query.per_page
        );

        if let Some(namespace) = query.namespace_filter() {
            url.push_str(&format!("&namespace_path={}", urlencoding::encode(namespace)));
        }

        url
    }
}

#[async_trait]
impl RepoPageSource for GitlabClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<RepoSummary>, ListingError> {
        tracing::debug!(
            "fetching page {} of {} for namespace {:?}",
            query.page,
            query.per_page,
            query.namespace_filter()
        );
        let url = Self::construct_projects_url(query);

        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| ListingError::Transport {
                page: query.page,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) => text,
                Err(_) => "Unknown error".to_string(),
            };
            return Err(ListingError::Status {
                page: query.page,
                status: status.as_u16(),
                body,
            });
        }

        let projects: Vec<GitlabProject> =
            response.json().await.map_err(|e| ListingError::Decode {
                page: query.page,
                message: e.to_string(),
            })?;

        Ok(projects.into_iter().map(RepoSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_projects_url_without_namespace() {
        let query = PageQuery::new("https://gitlab.com/", 3, None);
        let url = GitlabClient::construct_projects_url(&query);
        assert_eq!(
            url,
            "https://gitlab.com/api/v4/projects?page=3&per_page=100&statistics=true"
        );
    }

    #[test]
    fn test_construct_projects_url_encodes_namespace() {
        let query = PageQuery::new("https://gitlab.example.org", 1, Some("group/sub group"));
        let url = GitlabClient::construct_projects_url(&query);
        assert!(url.ends_with("&namespace_path=group%2Fsub%20group"));
    }

    #[test]
    fn test_construct_projects_url_skips_empty_namespace() {
        let query = PageQuery::new("https://gitlab.com", 1, Some(""));
        let url = GitlabClient::construct_projects_url(&query);
        assert!(!url.contains("namespace_path"));
    }

    #[test]
    fn test_project_url_falls_back_to_http_clone_url() {
        let project: GitlabProject = serde_json::from_value(serde_json::json!({
            "id": 7,
            "path_with_namespace": "group/project",
            "web_url": "",
            "http_url_to_repo": "https://gitlab.com/group/project.git",
            "created_at": "2020-01-02T03:04:05.000Z",
            "last_activity_at": "2024-05-06T07:08:09.123Z"
        }))
        .unwrap();

        let summary = RepoSummary::from(project);
        assert_eq!(summary.name, "group/project");
        assert_eq!(summary.url, "https://gitlab.com/group/project.git");
    }

    #[test]
    fn test_timestamps_serialize_in_normalized_form() {
        let project: GitlabProject = serde_json::from_value(serde_json::json!({
            "id": 8,
            "path_with_namespace": "group/other",
            "web_url": "https://gitlab.com/group/other",
            "created_at": "2020-01-02T03:04:05.000Z",
            "last_activity_at": "2024-05-06T07:08:09.123+02:00"
        }))
        .unwrap();

        let value = serde_json::to_value(RepoSummary::from(project)).unwrap();
        assert_eq!(value["created_at"], "2020-01-02T03:04:05Z");
        assert_eq!(value["updated_at"], "2024-05-06T05:08:09.123Z");
    }
}
