//! Route table
//!
//! Everything repository-scoped hangs off `/api/github/{owner}/{repo}`;
//! `/api/health` answers liveness probes. CORS is wide open, the gateway
//! serves read-only public data.

use crate::handlers::{self, AppState};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    let github = Router::new()
        .route("/{owner}/{repo}", get(handlers::repo_details))
        .route("/{owner}/{repo}/readme", get(handlers::readme))
        .route("/{owner}/{repo}/git/trees/{branch}", get(handlers::tree))
        .route("/{owner}/{repo}/contributors", get(handlers::contributors))
        .route("/{owner}/{repo}/deployments", get(handlers::deployments))
        .route("/{owner}/{repo}/issues", get(handlers::issues))
        .route(
            "/{owner}/{repo}/good-first-issues",
            get(handlers::good_first_issues),
        )
        .route(
            "/{owner}/{repo}/issues/{number}/timeline",
            get(handlers::issue_timeline),
        )
        .route("/{owner}/{repo}/commits", get(handlers::file_commits))
        .route("/{owner}/{repo}/pulls", get(handlers::pull_requests))
        .route("/{owner}/{repo}/hotspots", get(handlers::hotspots))
        .route("/{owner}/{repo}/timeline", get(handlers::repo_timeline))
        .route("/{owner}/{repo}/insights", get(handlers::pr_insights))
        .route(
            "/{owner}/{repo}/insights/dependencies",
            get(handlers::dependency_health),
        )
        .route("/{owner}/{repo}/file/{*path}", get(handlers::file_content));

    Router::new()
        .route("/api/health", get(handlers::health))
        .nest("/api/github", github)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
