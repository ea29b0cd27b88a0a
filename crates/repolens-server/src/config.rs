//! Server configuration
//!
//! Everything comes from the environment (a `.env` file is honored in
//! development). Every variable has a default except the optional secrets.

use anyhow::Context;
use repolens_github::{GITHUB_API_BASE, NPM_REGISTRY_BASE};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub github_api_base: String,
    pub npm_registry_base: String,
    pub upstream_timeout: Duration,
    /// Server-wide token serving anonymous callers, raises the rate limit
    pub fallback_token: Option<String>,
    /// TOML file with a `[tokens]` table of per-user GitHub tokens
    pub user_tokens_file: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid PORT: {raw}"))?,
            None => DEFAULT_PORT,
        };
        let bind = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid HOST: {host}"))?;

        let timeout_secs = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid UPSTREAM_TIMEOUT_SECS: {raw}"))?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };

        Ok(Self {
            bind,
            github_api_base: lookup("GITHUB_API_BASE")
                .unwrap_or_else(|| GITHUB_API_BASE.to_string()),
            npm_registry_base: lookup("NPM_REGISTRY_BASE")
                .unwrap_or_else(|| NPM_REGISTRY_BASE.to_string()),
            upstream_timeout: Duration::from_secs(timeout_secs),
            fallback_token: lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()),
            user_tokens_file: lookup("USER_TOKENS_FILE").filter(|p| !p.is_empty()),
        })
    }
}
