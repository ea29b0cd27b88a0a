//! Dependency health report
//!
//! Call plan: locate a `package.json` in the default branch's tree, merge
//! its runtime and development dependency maps, then query the package
//! registry once per dependency, concurrently. A failed registry lookup
//! becomes a per-item error marker; the summary only counts items that
//! resolved. A missing or unreadable manifest is an explicit result object,
//! not an error.

use crate::aggregate::settle_all;
use crate::error::GatewayError;
use crate::gateway::{repo_key, Gateway};
use crate::registry::PackageInfo;
use crate::ttl;
use crate::upstream::ACCEPT_RAW;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Health status of one declared dependency
///
/// Either the registry fields are populated, or `error` is set and the
/// item is excluded from summary counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatus {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_outdated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deterministic rollup over the per-item results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencySummary {
    pub total: usize,
    pub outdated: usize,
    pub deprecated: usize,
    pub licenses: Vec<String>,
}

/// The report body: either a real report or an explicit "no manifest"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependencyReport {
    Report {
        dependencies: Vec<DependencyStatus>,
        summary: DependencySummary,
    },
    Missing {
        error: String,
    },
}

impl Gateway {
    pub async fn dependency_health(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<DependencyReport, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:insights:dependencies", &cred.scope, owner, repo).build();
        if let Some(hit) = self.cache_get::<DependencyReport>(&key).await {
            return Ok(hit);
        }

        let client = self.client_for(&cred);
        let branch = self.default_branch(client.as_ref(), owner, repo).await?;
        let tree = client
            .get_json(
                &format!("/repos/{owner}/{repo}/git/trees/{branch}"),
                &[("recursive", "1")],
            )
            .await
            .map_err(|e| e.describing("repository tree"))?;

        let Some(manifest_path) = find_manifest(&tree) else {
            // explicit result object, and not worth caching
            return Ok(DependencyReport::Missing {
                error: "package.json not found in this repository.".to_string(),
            });
        };

        let manifest: Value = match client
            .get_text(
                &format!("/repos/{owner}/{repo}/contents/{manifest_path}"),
                ACCEPT_RAW,
            )
            .await
            .map_err(|e| e.describing("package manifest"))
            .and_then(|body| {
                serde_json::from_str(&body).map_err(|_| {
                    GatewayError::Upstream("Manifest was not valid JSON.".to_string())
                })
            }) {
            Ok(manifest) => manifest,
            Err(_) => {
                return Ok(DependencyReport::Missing {
                    error: "Could not read the package.json file.".to_string(),
                })
            }
        };

        let declared = merge_dependencies(&manifest);
        let lookups: Vec<_> = declared
            .into_iter()
            .map(|(name, version)| {
                let registry = Arc::clone(&self.registry);
                async move {
                    match registry.lookup(&name).await {
                        Ok(info) => Ok(classify(&name, &version, &info)),
                        Err(_) => Err(DependencyStatus {
                            name,
                            version,
                            latest_version: None,
                            license: None,
                            is_outdated: None,
                            is_deprecated: None,
                            error: Some("Package not found in npm registry".to_string()),
                        }),
                    }
                }
            })
            .collect();

        let dependencies: Vec<DependencyStatus> = settle_all(lookups)
            .await
            .into_iter()
            .map(|settled| settled.unwrap_or_else(|marker| marker))
            .collect();

        let summary = summarize(&dependencies);
        let report = DependencyReport::Report {
            dependencies,
            summary,
        };
        self.cache_put(&key, &report, ttl::DEPENDENCY_HEALTH).await;
        Ok(report)
    }
}

/// First tree node that is a `package.json`
fn find_manifest(tree: &Value) -> Option<String> {
    tree["tree"].as_array()?.iter().find_map(|node| {
        node["path"]
            .as_str()
            .filter(|p| p.ends_with("package.json"))
            .map(String::from)
    })
}

/// Runtime and development dependencies as one name → version map
///
/// A BTreeMap keeps the fan-out and report order deterministic. As in the
/// manifest format itself, a dev entry overrides a runtime entry of the
/// same name.
fn merge_dependencies(manifest: &Value) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(map) = manifest[section].as_object() {
            for (name, version) in map {
                if let Some(version) = version.as_str() {
                    merged.insert(name.clone(), version.to_string());
                }
            }
        }
    }
    merged
}

/// Declared version with range qualifiers stripped for comparison
fn strip_range(version: &str) -> String {
    version
        .chars()
        .filter(|c| !matches!(c, '^' | '~' | '>' | '=' | '<'))
        .collect()
}

fn classify(name: &str, declared: &str, info: &PackageInfo) -> DependencyStatus {
    DependencyStatus {
        name: name.to_string(),
        version: declared.to_string(),
        latest_version: Some(info.latest.clone()),
        license: info.license.clone(),
        is_outdated: Some(info.latest != strip_range(declared)),
        is_deprecated: Some(info.deprecated),
        error: None,
    }
}

/// Counts reflect only items that resolved; licenses are sorted and distinct
fn summarize(items: &[DependencyStatus]) -> DependencySummary {
    let resolved = || items.iter().filter(|d| d.error.is_none());
    let mut licenses: Vec<String> = resolved()
        .filter_map(|d| d.license.clone())
        .collect();
    licenses.sort();
    licenses.dedup();

    DependencySummary {
        total: items.len(),
        outdated: resolved().filter(|d| d.is_outdated == Some(true)).count(),
        deprecated: resolved()
            .filter(|d| d.is_deprecated == Some(true))
            .count(),
        licenses,
    }
}
