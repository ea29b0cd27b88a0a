//! Code hotspots by commit churn
//!
//! Call plan: fetch the most recent commits, then one concurrent detail
//! fetch per commit for its file-level change list. Churn is the number of
//! sampled commits touching a file. A failed detail fetch drops out of the
//! tally silently; partial data beats no data.

use crate::aggregate::settle_all;
use crate::error::GatewayError;
use crate::gateway::{repo_key, Gateway};
use crate::ttl;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// How many recent commits the churn sample covers
const COMMIT_SAMPLE_SIZE: &str = "100";

/// One file ranked by change frequency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hotspot {
    pub path: String,
    pub churn: u64,
}

impl Gateway {
    pub async fn hotspots(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<Vec<Hotspot>, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:hotspots", &cred.scope, owner, repo).build();
        if let Some(hit) = self.cache_get::<Vec<Hotspot>>(&key).await {
            return Ok(hit);
        }

        let client = self.client_for(&cred);
        let commits = client
            .get_json(
                &format!("/repos/{owner}/{repo}/commits"),
                &[("per_page", COMMIT_SAMPLE_SIZE)],
            )
            .await
            .map_err(|e| e.describing("commits"))?;

        let detail_urls: Vec<String> = commits
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|c| c["url"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let fetches: Vec<_> = detail_urls
            .into_iter()
            .map(|url| {
                let client = Arc::clone(&client);
                async move { client.get_url_json(&url).await }
            })
            .collect();

        let details = settle_all(fetches).await.into_iter().filter_map(|result| {
            match result {
                Ok(detail) => Some(detail),
                Err(e) => {
                    debug!("dropping commit detail from churn tally: {}", e);
                    None
                }
            }
        });

        let ranked = tally(details);
        self.cache_put(&key, &ranked, ttl::HOTSPOTS).await;
        Ok(ranked)
    }
}

/// Count commits per touched file and rank descending
///
/// Ties break on path so the ranking is deterministic regardless of how
/// many detail fetches failed.
fn tally(details: impl IntoIterator<Item = Value>) -> Vec<Hotspot> {
    let mut churn: HashMap<String, u64> = HashMap::new();
    for detail in details {
        if let Some(files) = detail["files"].as_array() {
            for file in files {
                if let Some(name) = file["filename"].as_str() {
                    *churn.entry(name.to_string()).or_default() += 1;
                }
            }
        }
    }

    let mut ranked: Vec<Hotspot> = churn
        .into_iter()
        .map(|(path, churn)| Hotspot { path, churn })
        .collect();
    ranked.sort_by(|a, b| b.churn.cmp(&a.churn).then_with(|| a.path.cmp(&b.path)));
    ranked
}
