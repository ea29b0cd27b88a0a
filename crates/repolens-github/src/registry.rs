//! Package registry client
//!
//! Looks up a package's latest version, license, and deprecation flag on the
//! npm registry for the dependency-health report. Like the upstream client,
//! the trait seam exists so tests can fake the registry.

use crate::error::GatewayError;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::time::Duration;

/// Public npm registry base
pub const NPM_REGISTRY_BASE: &str = "https://registry.npmjs.org";

/// What the registry knows about one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub latest: String,
    pub license: Option<String>,
    pub deprecated: bool,
}

#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<PackageInfo, GatewayError>;
}

/// reqwest-backed npm registry client
pub struct NpmRegistry {
    base_url: String,
    http: reqwest::Client,
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    async fn lookup(&self, name: &str) -> Result<PackageInfo, GatewayError> {
        let url = format!("{}/{}", self.base_url, name);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|_| GatewayError::Upstream("Registry request failed.".to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::from_status(status.as_u16(), "package"));
        }

        let body: Value = response.json().await.map_err(|_| {
            GatewayError::Upstream("Registry returned an unreadable response.".to_string())
        })?;

        parse_package(&body)
            .ok_or_else(|| GatewayError::Upstream("Registry document is incomplete.".to_string()))
    }
}

/// Extract the fields we care about from a registry package document
fn parse_package(body: &Value) -> Option<PackageInfo> {
    let latest = body["dist-tags"]["latest"].as_str()?.to_string();

    // license is a string on modern packages, an object on old ones
    let license = match &body["license"] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(o) => o.get("type").and_then(Value::as_str).map(String::from),
        _ => None,
    };

    let deprecated = match &body["deprecated"] {
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        _ => false,
    };

    Some(PackageInfo {
        latest,
        license,
        deprecated,
    })
}
