//! Tests for the HTTP routes, status codes and JSON envelopes
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; both
//! upstream clients are stubs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use gitmeta_proxy::gitmeta::remote_refs::{
    AdvertisedRef, GitRemoteClient, GitRemoteError, RemoteInfo,
};
use gitmeta_proxy::gitmeta::repository_listing::{
    ListingError, PageQuery, RepoPageSource, RepoSummary,
};
use gitmeta_proxy::transport::{AppState, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

const TAG_OID: &str = "5555555555555555555555555555555555555555";
const COMMIT_OID: &str = "6666666666666666666666666666666666666666";

/// Remote stub: every URL containing "invalid" fails, the rest share one advertisement
#[derive(Default)]
struct StubRemote {
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl GitRemoteClient for StubRemote {
    async fn get_remote_info(&self, url: &str) -> Result<RemoteInfo, GitRemoteError> {
        self.requested.lock().unwrap().push(url.to_string());
        if url.contains("invalid") {
            return Err(GitRemoteError::Http {
                status: 404,
                reason: "Not Found".to_string(),
            });
        }
        Ok(RemoteInfo {
            head: Some("refs/heads/main".to_string()),
            capabilities: vec![],
            refs: vec![
                AdvertisedRef {
                    name: "refs/heads/main".to_string(),
                    oid: COMMIT_OID.to_string(),
                },
                AdvertisedRef {
                    name: "refs/tags/v1.0".to_string(),
                    oid: TAG_OID.to_string(),
                },
                AdvertisedRef {
                    name: "refs/tags/v1.0^{}".to_string(),
                    oid: COMMIT_OID.to_string(),
                },
            ],
        })
    }
}

/// Listing stub over `total` repositories, or failing every fetch
struct StubListing {
    total: u64,
    fail: bool,
    queries: Mutex<Vec<PageQuery>>,
}

impl StubListing {
    fn new(total: u64) -> Self {
        Self {
            total,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RepoPageSource for StubListing {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Vec<RepoSummary>, ListingError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(ListingError::Transport {
                page: query.page,
                message: "connection refused".to_string(),
            });
        }

        let per_page = u64::from(query.per_page);
        let first = (query.page - 1) * per_page;
        let count = self.total.saturating_sub(first).min(per_page);
        let timestamp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        Ok((first..first + count)
            .map(|id| RepoSummary {
                name: format!("group/project-{}", id),
                id,
                url: format!("https://gitlab.example/group/project-{}", id),
                created_at: timestamp,
                updated_at: timestamp,
            })
            .collect())
    }
}

fn app(remote: Arc<StubRemote>, listing: Arc<StubListing>) -> Router {
    create_router(Arc::new(AppState::new(
        remote,
        listing,
        "https://gitlab.default.example",
    )))
}

fn default_app() -> Router {
    app(Arc::new(StubRemote::default()), Arc::new(StubListing::new(37)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// `/git/refs` without any URL is rejected
#[tokio::test]
async fn test_git_refs_requires_url() {
    let (status, body) = get(default_app(), "/git/refs").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required parameter \"url\"" }));
}

/// `/git/refs` accepts at most 9 URLs
#[tokio::test]
async fn test_git_refs_rejects_ten_urls() {
    let remote = Arc::new(StubRemote::default());
    let query: Vec<String> = (0..10).map(|i| format!("url=host/repo-{}", i)).collect();
    let uri = format!("/git/refs?{}", query.join("&"));

    let (status, body) = get(app(remote.clone(), Arc::new(StubListing::new(0))), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Too many URLs provided. Maximum is 9.");
    assert!(remote.requested.lock().unwrap().is_empty());
}

/// An empty `url` value is a bad request
#[tokio::test]
async fn test_git_refs_rejects_empty_url() {
    let (status, _) = get(default_app(), "/git/refs?url=host/repo&url=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// One bad URL lands in `errors`, the good one in `data`, with status 200
#[tokio::test]
async fn test_git_refs_partial_failure() {
    let (status, body) = get(
        default_app(),
        "/git/refs?url=https%3A%2F%2Fhost%2Frepo.git&url=host%2Finvalid",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "https://host/repo.git": [
                    { "ref": "refs/tags/v1.0", "oid": TAG_OID, "peeled": COMMIT_OID }
                ]
            },
            "errors": {
                "host/invalid": "HTTP Error: 404 Not Found"
            }
        })
    );
}

/// The prefix parameter selects which refs are listed
#[tokio::test]
async fn test_git_refs_prefix() {
    let (status, body) = get(default_app(), "/git/refs?url=host/repo&prefix=refs/heads/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["host/repo"],
        json!([{ "ref": "refs/heads/main", "oid": COMMIT_OID }])
    );
}

/// `/git/meta` resolves annotated tags and HEAD under the normalized URL
#[tokio::test]
async fn test_git_meta() {
    let (status, body) = get(default_app(), "/git/meta?url=host/repo").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "https://host/repo.git": { "HEAD": COMMIT_OID, "v1.0": COMMIT_OID }
            },
            "errors": {}
        })
    );
}

/// A small estimate on a 37 repository listing finds the partial first page
#[tokio::test]
async fn test_gitlab_repos_count() {
    let listing = Arc::new(StubListing::new(37));
    let (status, body) = get(
        app(Arc::new(StubRemote::default()), listing.clone()),
        "/gitlab/repos/count?estimate=150&namespace=group",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "total_pages": 1, "total": 37 }));

    let queries = listing.queries.lock().unwrap();
    assert!(queries.iter().all(|q| q.base_url == "https://gitlab.default.example"));
    assert!(queries.iter().all(|q| q.namespace_filter() == Some("group")));
}

/// Bulk listing returns the requested page range in order
#[tokio::test]
async fn test_gitlab_repos_page_range() {
    let listing = Arc::new(StubListing::new(350));
    let (status, body) = get(
        app(Arc::new(StubRemote::default()), listing.clone()),
        "/gitlab/repos?url=https://gitlab.other.example&start=2&limit=2",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let repos = body.as_array().unwrap();
    assert_eq!(repos.len(), 200);
    assert_eq!(repos[0]["id"], 100);
    assert_eq!(repos[0]["name"], "group/project-100");
    assert_eq!(repos[199]["id"], 299);

    let mut pages: Vec<u64> = listing.queries.lock().unwrap().iter().map(|q| q.page).collect();
    pages.sort_unstable();
    assert_eq!(pages, vec![2, 3]);
    assert!(
        listing
            .queries
            .lock()
            .unwrap()
            .iter()
            .all(|q| q.base_url == "https://gitlab.other.example")
    );
}

/// Malformed numeric parameters are bad requests
#[tokio::test]
async fn test_gitlab_repos_invalid_numbers() {
    let (status, _) = get(default_app(), "/gitlab/repos?start=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(default_app(), "/gitlab/repos?start=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(default_app(), "/gitlab/repos/count?estimate=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Page ranges beyond the fan-out bound are rejected before any fetch
#[tokio::test]
async fn test_gitlab_repos_rejects_oversized_range() {
    for uri in [
        "/gitlab/repos?limit=1001",
        "/gitlab/repos?limit=1000000000000",
        "/gitlab/repos?limit=18446744073709551615",
        "/gitlab/repos?start=18446744073709551615&limit=2",
    ] {
        let listing = Arc::new(StubListing::new(0));
        let (status, body) = get(app(Arc::new(StubRemote::default()), listing.clone()), uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].as_str().unwrap().contains("Invalid value"), "{}", uri);
        assert!(listing.queries.lock().unwrap().is_empty(), "{}", uri);
    }

    let (status, body) = get(default_app(), "/gitlab/repos?limit=1000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 37);
}

/// Upstream failures are answered with a generic 500
#[tokio::test]
async fn test_gitlab_failure_is_internal_server_error() {
    let listing = Arc::new(StubListing {
        total: 0,
        fail: true,
        queries: Mutex::new(Vec::new()),
    });

    let (status, body) = get(
        app(Arc::new(StubRemote::default()), listing.clone()),
        "/gitlab/repos?limit=3",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal Server Error" }));

    let (status, body) = get(
        app(Arc::new(StubRemote::default()), listing),
        "/gitlab/repos/count",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal Server Error" }));
}

/// Unknown paths list the available routes
#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = get(default_app(), "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({
            "error": "Not Found",
            "apis": ["/git/refs", "/git/meta", "/gitlab/repos", "/gitlab/repos/count"]
        })
    );
}

/// Non-GET methods on known paths are treated as unknown routes
#[tokio::test]
async fn test_wrong_method_is_not_found() {
    let response = default_app()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/git/refs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// CORS preflight is answered for any origin
#[tokio::test]
async fn test_cors_preflight() {
    let response = default_app()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/gitlab/repos")
                .header(header::ORIGIN, "https://dashboard.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

/// Regular responses carry the CORS header too
#[tokio::test]
async fn test_cors_header_on_get() {
    let response = default_app()
        .oneshot(
            Request::builder()
                .uri("/git/meta?url=host/repo")
                .header(header::ORIGIN, "https://dashboard.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
