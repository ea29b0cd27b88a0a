//! Upstream GitHub client and factory
//!
//! The factory builds one client per request from the resolved credential;
//! the client is bound to a fixed base URL and carries the default headers.
//! Construction is pure, all I/O happens behind the `UpstreamClient` trait
//! so tests can substitute a canned implementation.

use crate::error::GatewayError;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Public GitHub REST API base
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Default JSON media type
pub const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

/// Raw file content media type, avoids the base64-wrapped JSON envelope
pub const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";

/// Issue timeline preview media type
pub const ACCEPT_TIMELINE: &str = "application/vnd.github.mockingbird-preview+json";

/// GitHub rejects requests without a user agent
const USER_AGENT: &str = "repolens-gateway/0.1";

/// One configured upstream connection, credential already applied
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// GET a path relative to the API base, JSON response
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError>;

    /// GET with an overridden `Accept` header, body returned verbatim
    async fn get_text(&self, path: &str, accept: &str) -> Result<String, GatewayError>;

    /// GET an absolute URL handed out by a previous response
    /// (e.g. a deployment's `statuses_url` or a commit's detail URL)
    async fn get_url_json(&self, url: &str) -> Result<Value, GatewayError>;
}

/// Builds an `UpstreamClient` for a resolved credential
pub trait UpstreamFactory: Send + Sync {
    fn build(&self, token: Option<&str>) -> Arc<dyn UpstreamClient>;
}

/// reqwest-backed factory bound to one API base URL
///
/// The underlying connection pool is shared across all clients it builds;
/// only the authorization header differs per credential.
pub struct HttpFactory {
    base_url: String,
    http: reqwest::Client,
}

impl HttpFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

impl UpstreamFactory for HttpFactory {
    fn build(&self, token: Option<&str>) -> Arc<dyn UpstreamClient> {
        Arc::new(HttpUpstream {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            auth: token.map(|t| format!("token {t}")),
        })
    }
}

struct HttpUpstream {
    base_url: String,
    http: reqwest::Client,
    auth: Option<String>,
}

impl HttpUpstream {
    fn request(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url).header(ACCEPT, accept);
        if let Some(auth) = &self.auth {
            req = req.header(AUTHORIZATION, auth.clone());
        }
        req
    }

    async fn send_for_status(
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = req.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            debug!("upstream returned {}", status);
            return Err(GatewayError::from_status(status.as_u16(), "resource"));
        }
        Ok(response)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Upstream("Upstream request timed out.".to_string())
    } else {
        GatewayError::Upstream("Upstream request failed.".to_string())
    }
}

fn decode_error(_err: reqwest::Error) -> GatewayError {
    GatewayError::Upstream("Upstream returned an unreadable response.".to_string())
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);
        let req = self.request(&url, ACCEPT_JSON).query(query);
        let response = Self::send_for_status(req).await?;
        response.json().await.map_err(decode_error)
    }

    async fn get_text(&self, path: &str, accept: &str) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} (accept: {})", url, accept);
        let response = Self::send_for_status(self.request(&url, accept)).await?;
        response.text().await.map_err(decode_error)
    }

    async fn get_url_json(&self, url: &str) -> Result<Value, GatewayError> {
        debug!("GET {}", url);
        let response = Self::send_for_status(self.request(url, ACCEPT_JSON)).await?;
        response.json().await.map_err(decode_error)
    }
}
