//! Request handlers
//!
//! Thin adapters between the HTTP surface and the gateway: extract path and
//! query parameters plus the session identity, call the gateway, map the
//! result to JSON. All domain logic lives behind [`Gateway`].

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use repolens_github::{
    DependencyReport, DeploymentEntry, FileContent, Gateway, GatewayError, Hotspot, IssuesPayload,
    PrInsights, RepoTimeline,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// Caller identity from the `x-session-user` header, when present
///
/// The id is opaque here; the credential resolver decides what it means.
pub struct SessionUser(pub Option<String>);

impl SessionUser {
    fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let user = parts
            .headers
            .get("x-session-user")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from);
        Ok(SessionUser(user))
    }
}

/// Gateway error as an HTTP response: mapped status, `{ "message": … }` body
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "message": self.0.to_string() }))).into_response()
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn repo_details(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .repo_details(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn readme(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<FileContent>, ApiError> {
    let body = state.gateway.readme(&owner, &repo, user.as_deref()).await?;
    Ok(Json(body))
}

pub async fn tree(
    State(state): State<AppState>,
    Path((owner, repo, branch)): Path<(String, String, String)>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .tree(&owner, &repo, Some(&branch), user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn contributors(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .contributors(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn deployments(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Vec<DeploymentEntry>>, ApiError> {
    let body = state
        .gateway
        .deployments(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn issues(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<IssuesPayload>, ApiError> {
    let body = state.gateway.issues(&owner, &repo, user.as_deref()).await?;
    Ok(Json(body))
}

pub async fn good_first_issues(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .good_first_issues(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn issue_timeline(
    State(state): State<AppState>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .issue_timeline(&owner, &repo, number, user.as_deref())
        .await?;
    Ok(Json(body))
}

#[derive(Deserialize)]
pub struct FileCommitsQuery {
    #[serde(default)]
    path: String,
}

pub async fn file_commits(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<FileCommitsQuery>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .file_commits(&owner, &repo, &query.path, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn pull_requests(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .gateway
        .pull_requests(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn hotspots(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<Vec<Hotspot>>, ApiError> {
    let body = state
        .gateway
        .hotspots(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn repo_timeline(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<RepoTimeline>, ApiError> {
    let body = state
        .gateway
        .repo_timeline(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn pr_insights(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<PrInsights>, ApiError> {
    let body = state
        .gateway
        .pr_insights(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn dependency_health(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    user: SessionUser,
) -> Result<Json<DependencyReport>, ApiError> {
    let body = state
        .gateway
        .dependency_health(&owner, &repo, user.as_deref())
        .await?;
    Ok(Json(body))
}

pub async fn file_content(
    State(state): State<AppState>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    user: SessionUser,
) -> Result<Json<FileContent>, ApiError> {
    let body = state
        .gateway
        .file_content(&owner, &repo, &path, user.as_deref())
        .await?;
    Ok(Json(body))
}
