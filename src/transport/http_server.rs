//! axum router and request handlers
//!
//! Routes:
//! - `GET /git/refs`            - refs below a prefix for 1 to 9 repositories
//! - `GET /git/meta`            - tag commits and `HEAD` for 1 to 100 repositories
//! - `GET /gitlab/repos`        - a contiguous range of GitLab project pages
//! - `GET /gitlab/repos/count`  - estimated number of GitLab projects and pages
//!
//! Anything else answers 404 with the list above. CORS preflight is handled
//! for every route before routing.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::responses::{ApiError, NOT_FOUND, NotFoundResponse};
use crate::config::ServerConfig;
use crate::gitmeta::remote_refs::{
    GitRefFetcher, GitRemoteClient, RefFetchReport, RefMap, ServerRef, SmartHttpClient,
};
use crate::gitmeta::repository_listing::{
    EstimationResult, GitlabClient, RepoPageSource, RepoSummary,
};
use crate::services::{
    self,
    params::{QueryParams, RepoCountParams, RepoListParams},
};

/// Routes served by the façade
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum ApiRoute {
    #[strum(serialize = "/git/refs")]
    GitRefs,
    #[strum(serialize = "/git/meta")]
    GitMeta,
    #[strum(serialize = "/gitlab/repos")]
    GitlabRepos,
    #[strum(serialize = "/gitlab/repos/count")]
    GitlabReposCount,
}

impl ApiRoute {
    pub fn path(self) -> &'static str {
        self.into()
    }
}

/// Collaborators shared by all handlers
///
/// Holds clients only. No fetched data outlives the request that fetched it.
pub struct AppState {
    pub ref_fetcher: GitRefFetcher<Arc<dyn GitRemoteClient>>,
    pub page_source: Arc<dyn RepoPageSource>,
    pub default_gitlab_url: String,
}

impl AppState {
    pub fn new(
        git_client: Arc<dyn GitRemoteClient>,
        page_source: Arc<dyn RepoPageSource>,
        default_gitlab_url: impl Into<String>,
    ) -> Self {
        Self {
            ref_fetcher: GitRefFetcher::new(git_client),
            page_source,
            default_gitlab_url: default_gitlab_url.into(),
        }
    }

    /// Wires the smart-HTTP and GitLab clients over one reqwest client
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let client = config.build_http_client()?;
        Ok(Self::new(
            Arc::new(SmartHttpClient::new(client.clone())),
            Arc::new(GitlabClient::new(client)),
            config.default_gitlab_url.clone(),
        ))
    }
}

/// Build the axum [`Router`] with all routes, CORS and panic handling.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(ApiRoute::GitRefs.path(), get(handle_git_refs))
        .route(ApiRoute::GitMeta.path(), get(handle_git_meta))
        .route(ApiRoute::GitlabRepos.path(), get(handle_gitlab_repos))
        .route(
            ApiRoute::GitlabReposCount.path(),
            get(handle_gitlab_repos_count),
        )
        .fallback(handle_not_found)
        .method_not_allowed_fallback(handle_not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
}

/// `GET /git/refs?url=...&url=...&prefix=refs/tags/`
async fn handle_git_refs(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<RefFetchReport<Vec<ServerRef>>>, ApiError> {
    let query = QueryParams::parse(query.as_deref());
    let urls = query.all("url");
    let report = services::list_server_refs(&state.ref_fetcher, &urls, query.value("prefix")).await?;
    Ok(Json(report))
}

/// `GET /git/meta?url=...&url=...`
async fn handle_git_meta(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<RefFetchReport<RefMap>>, ApiError> {
    let query = QueryParams::parse(query.as_deref());
    let urls = query.all("url");
    let report = services::fetch_refs(&state.ref_fetcher, &urls).await?;
    Ok(Json(report))
}

/// `GET /gitlab/repos?url=...&namespace=...&start=1&limit=50`
async fn handle_gitlab_repos(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<RepoSummary>>, ApiError> {
    let query = QueryParams::parse(query.as_deref());
    let params = RepoListParams::from_query(&query, &state.default_gitlab_url)?;
    let repos = services::fetch_gitlab_repos(state.page_source.as_ref(), &params).await?;
    Ok(Json(repos))
}

/// `GET /gitlab/repos/count?url=...&namespace=...&estimate=100000`
async fn handle_gitlab_repos_count(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<EstimationResult>, ApiError> {
    let query = QueryParams::parse(query.as_deref());
    let params = RepoCountParams::from_query(&query, &state.default_gitlab_url)?;
    let result = services::count_gitlab_repos(state.page_source.as_ref(), &params).await?;
    Ok(Json(result))
}

async fn handle_not_found() -> Response {
    let body = NotFoundResponse {
        error: NOT_FOUND.to_string(),
        apis: ApiRoute::iter().map(|r| r.path().to_string()).collect(),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("handler panicked: {}", detail);
    ApiError::Unexpected.into_response()
}

/// HTTP server bound to the configured address
pub struct HttpServerApp {
    bind_addr: SocketAddr,
    state: Arc<AppState>,
}

impl HttpServerApp {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Ok(Self {
            bind_addr: config.bind_addr,
            state: Arc::new(AppState::from_config(config)?),
        })
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(async {
                // Wait for Ctrl+C signal to gracefully shutdown
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("failed to listen for shutdown signal: {}", e);
                }
            })
            .await?;

        Ok(())
    }
}
