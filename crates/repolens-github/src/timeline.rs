//! Repository commit timeline
//!
//! Branches, tags, and up to 500 recent commits in one payload for the
//! timeline view. Commit pages are fetched sequentially (page N decides
//! whether N+1 exists); tags are joined onto commits by SHA.

use crate::error::GatewayError;
use crate::gateway::{repo_key, Gateway};
use crate::ttl;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const MAX_COMMITS: usize = 500;
const COMMITS_PER_PAGE: usize = 100;

/// Branch or tag head
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefEntry {
    pub name: String,
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineAuthor {
    pub name: String,
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineCommit {
    pub sha: String,
    pub message: String,
    pub author: TimelineAuthor,
    pub date: Option<String>,
    pub parents: Vec<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoTimeline {
    pub commits: Vec<TimelineCommit>,
    pub branches: Vec<RefEntry>,
    pub tags: Vec<RefEntry>,
}

impl Gateway {
    pub async fn repo_timeline(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<RepoTimeline, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:timeline", &cred.scope, owner, repo).build();
        if let Some(hit) = self.cache_get::<RepoTimeline>(&key).await {
            return Ok(hit);
        }

        let client = self.client_for(&cred);
        let branches_path = format!("/repos/{owner}/{repo}/branches");
        let tags_path = format!("/repos/{owner}/{repo}/tags");
        let (branches, tags) = tokio::join!(
            client.get_json(&branches_path, &[]),
            client.get_json(&tags_path, &[]),
        );
        let branches = branches.map_err(|e| e.describing("branches"))?;
        let tags = tags.map_err(|e| e.describing("tags"))?;

        let mut commits: Vec<Value> = Vec::new();
        let mut page = 1usize;
        while commits.len() < MAX_COMMITS {
            let page_param = page.to_string();
            let batch = client
                .get_json(
                    &format!("/repos/{owner}/{repo}/commits"),
                    &[("per_page", "100"), ("page", &page_param)],
                )
                .await
                .map_err(|e| e.describing("commit history"))?;
            let Some(batch) = batch.as_array() else { break };
            if batch.is_empty() {
                break;
            }
            let last_page = batch.len() < COMMITS_PER_PAGE;
            commits.extend(batch.iter().cloned());
            if last_page {
                break;
            }
            page += 1;
        }
        commits.truncate(MAX_COMMITS);

        let timeline = build_timeline(&commits, &branches, &tags);
        self.cache_put(&key, &timeline, ttl::REPO_TIMELINE).await;
        Ok(timeline)
    }
}

fn ref_entries(refs: &Value) -> Vec<RefEntry> {
    refs.as_array()
        .map(|list| {
            list.iter()
                .filter_map(|r| {
                    Some(RefEntry {
                        name: r["name"].as_str()?.to_string(),
                        sha: r["commit"]["sha"].as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn build_timeline(commits: &[Value], branches: &Value, tags: &Value) -> RepoTimeline {
    let tags = ref_entries(tags);
    let tag_by_sha: HashMap<&str, &str> = tags
        .iter()
        .map(|t| (t.sha.as_str(), t.name.as_str()))
        .collect();

    let commits = commits
        .iter()
        .filter_map(|commit| {
            let sha = commit["sha"].as_str()?.to_string();
            let author_name = commit["commit"]["author"]["name"]
                .as_str()
                .unwrap_or("unknown")
                .to_string();
            // the GitHub account may be absent (e.g. unmapped author email)
            let login = commit["author"]["login"]
                .as_str()
                .unwrap_or(&author_name)
                .to_string();

            Some(TimelineCommit {
                tag: tag_by_sha.get(sha.as_str()).map(|&t| t.to_string()),
                message: commit["commit"]["message"].as_str().unwrap_or_default().to_string(),
                author: TimelineAuthor {
                    name: author_name,
                    login,
                    avatar_url: commit["author"]["avatar_url"].as_str().map(String::from),
                },
                date: commit["commit"]["author"]["date"].as_str().map(String::from),
                parents: commit["parents"]
                    .as_array()
                    .map(|parents| {
                        parents
                            .iter()
                            .filter_map(|p| p["sha"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
                sha,
            })
        })
        .collect();

    RepoTimeline {
        commits,
        branches: ref_entries(branches),
        tags,
    }
}
