//! Deployments with live environment URLs
//!
//! Call plan: fetch the deployment list, then one concurrent status fetch
//! per deployment. A deployment contributes an entry when its status
//! history contains a successful state with an environment URL; only the
//! first entry per environment name survives. A repository homepage is
//! always surfaced as a synthetic `Homepage` entry, deduplicated by URL.

use crate::aggregate::settle_all;
use crate::error::GatewayError;
use crate::gateway::{repo_key, Gateway};
use crate::ttl;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Environment name the synthetic homepage entry is filed under
const HOMEPAGE_ENVIRONMENT: &str = "Homepage";

/// One reachable deployed environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEntry {
    pub environment: String,
    pub url: String,
    pub created_at: Option<String>,
}

impl Gateway {
    pub async fn deployments(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<Vec<DeploymentEntry>, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:deployments", &cred.scope, owner, repo).build();
        if let Some(hit) = self.cache_get::<Vec<DeploymentEntry>>(&key).await {
            return Ok(hit);
        }

        let client = self.client_for(&cred);

        // metadata first: it carries the homepage, and a bad repo should
        // surface as 404 rather than an empty deployment list
        let repo_body = client
            .get_json(&format!("/repos/{owner}/{repo}"), &[])
            .await
            .map_err(|e| e.describing("repository data"))?;

        // a repository without deployments is an empty result, not an error
        let deployments = match client
            .get_json(&format!("/repos/{owner}/{repo}/deployments"), &[])
            .await
        {
            Ok(body) => body.as_array().cloned().unwrap_or_default(),
            Err(GatewayError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.describing("deployments")),
        };

        let fetches: Vec<_> = deployments
            .iter()
            .map(|deployment| {
                let client = Arc::clone(&client);
                async move {
                    let url = deployment["statuses_url"].as_str().ok_or(())?;
                    match client.get_url_json(url).await {
                        Ok(statuses) => pick_active(deployment, &statuses).ok_or(()),
                        Err(e) => {
                            debug!(
                                "skipping deployment {}: {}",
                                deployment["id"].as_u64().unwrap_or_default(),
                                e
                            );
                            Err(())
                        }
                    }
                }
            })
            .collect();

        let mut seen_environments = HashSet::new();
        let mut entries = Vec::new();
        for entry in settle_all(fetches).await.into_iter().flatten() {
            // first success per environment wins
            if seen_environments.insert(entry.environment.clone()) {
                entries.push(entry);
            }
        }

        let entries = merge_homepage(homepage_entry(&repo_body), entries);
        self.cache_put(&key, &entries, ttl::DEPLOYMENTS).await;
        Ok(entries)
    }
}

/// The entry a deployment contributes, if any: the first status that is
/// both successful and carries an environment URL
fn pick_active(deployment: &Value, statuses: &Value) -> Option<DeploymentEntry> {
    let environment = deployment["environment"].as_str()?.to_string();
    let status = statuses.as_array()?.iter().find(|status| {
        status["state"].as_str() == Some("success")
            && status["environment_url"].as_str().is_some_and(|u| !u.is_empty())
    })?;

    Some(DeploymentEntry {
        environment,
        url: status["environment_url"].as_str()?.to_string(),
        created_at: deployment["created_at"].as_str().map(String::from),
    })
}

/// Synthetic entry for the repository homepage, when one is declared
fn homepage_entry(repo: &Value) -> Option<DeploymentEntry> {
    let homepage = repo["homepage"].as_str().filter(|u| !u.is_empty())?;
    Some(DeploymentEntry {
        environment: HOMEPAGE_ENVIRONMENT.to_string(),
        url: homepage.to_string(),
        created_at: repo["created_at"].as_str().map(String::from),
    })
}

/// Prepend the homepage unless a fetched deployment already serves its URL
fn merge_homepage(
    homepage: Option<DeploymentEntry>,
    entries: Vec<DeploymentEntry>,
) -> Vec<DeploymentEntry> {
    match homepage {
        Some(home) if !entries.iter().any(|e| e.url == home.url) => {
            let mut merged = Vec::with_capacity(entries.len() + 1);
            merged.push(home);
            merged.extend(entries);
            merged
        }
        _ => entries,
    }
}
