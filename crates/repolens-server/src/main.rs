//! RepoLens server binary
//!
//! Wires the concrete collaborators (in-memory cache, TOML-backed user
//! store, reqwest upstream factory, npm registry) into the gateway and
//! serves the HTTP surface.

mod config;
mod handlers;
mod routes;

use anyhow::Context;
use config::Config;
use handlers::AppState;
use log::info;
use repolens_github::{
    CredentialResolver, Gateway, HttpFactory, MemoryCache, NpmRegistry, StaticUserStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    let user_store = match &config.user_tokens_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading user token file {path}"))?;
            StaticUserStore::from_toml_str(&content)
                .with_context(|| format!("parsing user token file {path}"))?
        }
        None => StaticUserStore::default(),
    };

    let gateway = Gateway::new(
        Arc::new(MemoryCache::new()),
        CredentialResolver::new(Arc::new(user_store), config.fallback_token.clone()),
        Arc::new(HttpFactory::new(
            &config.github_api_base,
            config.upstream_timeout,
        )?),
        Arc::new(NpmRegistry::new(
            &config.npm_registry_base,
            config.upstream_timeout,
        )?),
    );

    let app = routes::router(AppState {
        gateway: Arc::new(gateway),
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!("repolens listening on {}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
