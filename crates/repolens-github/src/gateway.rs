//! Cached endpoint handlers
//!
//! Every handler follows the same shape: resolve the credential, build the
//! scoped cache key, try the cache, and only on a miss build an upstream
//! client and execute the call plan. Successful results are written back
//! with the resource's TTL; failures are never cached.
//!
//! The fan-out resources (deployments, hotspots, dependency health, repo
//! timeline, PR insights) live in their own modules as further `impl`
//! blocks on [`Gateway`].

use crate::credentials::{CredentialResolver, ResolvedCredential};
use crate::error::GatewayError;
use crate::registry::PackageRegistry;
use crate::ttl;
use crate::upstream::{UpstreamClient, UpstreamFactory, ACCEPT_RAW, ACCEPT_TIMELINE};
use log::{debug, warn};
use repolens_cache::{CacheStore, ResourceKey, Scope};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Branch sentinel meaning "resolve the repository's default branch"
pub const DEFAULT_BRANCH_SENTINEL: &str = "default";

/// Open and closed issues fetched in one request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssuesPayload {
    pub open: Value,
    pub closed: Value,
}

/// Raw file content plus the metadata the UI needs to link back to GitHub
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    pub file_name: String,
    pub file_url: String,
}

/// The cached pass-through gateway in front of the GitHub REST API
///
/// All collaborators are injected: the cache store, the user-record store
/// (behind the credential resolver), the upstream client factory, and the
/// package registry. Tests swap any of them for in-memory fakes.
pub struct Gateway {
    cache: Arc<dyn CacheStore>,
    credentials: CredentialResolver,
    upstream: Arc<dyn UpstreamFactory>,
    pub(crate) registry: Arc<dyn PackageRegistry>,
}

impl Gateway {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        credentials: CredentialResolver,
        upstream: Arc<dyn UpstreamFactory>,
        registry: Arc<dyn PackageRegistry>,
    ) -> Self {
        Self {
            cache,
            credentials,
            upstream,
            registry,
        }
    }

    pub(crate) async fn credential(&self, session_user: Option<&str>) -> ResolvedCredential {
        self.credentials.resolve(session_user).await
    }

    pub(crate) fn client_for(&self, cred: &ResolvedCredential) -> Arc<dyn UpstreamClient> {
        self.upstream.build(cred.token.as_deref())
    }

    /// Cache read; store failures and unparseable entries count as misses
    pub(crate) async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(body)) => match serde_json::from_str(&body) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("discarding unparseable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("cache read failed for {}, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Cache write; a failing store only costs us the next fetch
    pub(crate) async fn cache_put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(body) => {
                if let Err(e) = self.cache.set(key, &body, ttl).await {
                    warn!("cache write skipped for {}: {}", key, e);
                }
            }
            Err(e) => debug!("not caching unserializable value for {}: {}", key, e),
        }
    }

    /// Single-call passthrough with the standard cache flow
    async fn cached_passthrough(
        &self,
        key: &str,
        ttl: Duration,
        client: &dyn UpstreamClient,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Value, GatewayError> {
        if let Some(hit) = self.cache_get::<Value>(key).await {
            return Ok(hit);
        }
        let body = client
            .get_json(path, query)
            .await
            .map_err(|e| e.describing(what))?;
        self.cache_put(key, &body, ttl).await;
        Ok(body)
    }

    // === Single-call resources ===

    pub async fn repo_details(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo", &cred.scope, owner, repo).build();
        if let Some(hit) = self.cache_get::<Value>(&key).await {
            return Ok(hit);
        }
        let client = self.client_for(&cred);
        let body = client
            .get_json(&format!("/repos/{owner}/{repo}"), &[])
            .await
            .map_err(|e| e.describing("repository data"))?;
        self.cache_put(&key, &body, ttl::REPO).await;
        Ok(body)
    }

    /// Decoded README body; uncached, GitHub serves it fast and it is the
    /// first thing a user edits
    pub async fn readme(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<FileContent, GatewayError> {
        let cred = self.credential(session_user).await;
        let client = self.client_for(&cred);
        let content = client
            .get_text(&format!("/repos/{owner}/{repo}/readme"), ACCEPT_RAW)
            .await
            .map_err(|e| e.describing("README"))?;
        Ok(FileContent {
            content,
            file_name: "README".to_string(),
            file_url: format!("https://github.com/{owner}/{repo}#readme"),
        })
    }

    pub async fn contributors(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:contributors", &cred.scope, owner, repo).build();
        let client = self.client_for(&cred);
        self.cached_passthrough(
            &key,
            ttl::CONTRIBUTORS,
            client.as_ref(),
            &format!("/repos/{owner}/{repo}/contributors"),
            &[],
            "contributors",
        )
        .await
    }

    /// Open and closed issues, fetched concurrently
    pub async fn issues(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<IssuesPayload, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:issues", &cred.scope, owner, repo).build();
        if let Some(hit) = self.cache_get::<IssuesPayload>(&key).await {
            return Ok(hit);
        }

        let client = self.client_for(&cred);
        let path = format!("/repos/{owner}/{repo}/issues");
        let (open, closed) = tokio::join!(
            client.get_json(&path, &[("state", "open"), ("per_page", "50")]),
            client.get_json(&path, &[("state", "closed"), ("per_page", "50")]),
        );
        let payload = IssuesPayload {
            open: open.map_err(|e| e.describing("issues"))?,
            closed: closed.map_err(|e| e.describing("issues"))?,
        };

        self.cache_put(&key, &payload, ttl::ISSUES).await;
        Ok(payload)
    }

    pub async fn good_first_issues(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("repo:good-first-issues", &cred.scope, owner, repo).build();
        let client = self.client_for(&cred);
        self.cached_passthrough(
            &key,
            ttl::GOOD_FIRST_ISSUES,
            client.as_ref(),
            &format!("/repos/{owner}/{repo}/issues"),
            &[("labels", "good first issue,help wanted"), ("state", "open")],
            "good first issues",
        )
        .await
    }

    /// Timeline events for one issue, needs a preview media type
    pub async fn issue_timeline(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let cred = self.credential(session_user).await;
        let key = repo_key("issue:timeline", &cred.scope, owner, repo)
            .param("issue", issue_number.to_string())
            .build();
        if let Some(hit) = self.cache_get::<Value>(&key).await {
            return Ok(hit);
        }

        let client = self.client_for(&cred);
        let body = client
            .get_text(
                &format!("/repos/{owner}/{repo}/issues/{issue_number}/timeline"),
                ACCEPT_TIMELINE,
            )
            .await
            .map_err(|e| e.describing("issue timeline"))?;
        let events: Value = serde_json::from_str(&body).map_err(|_| {
            GatewayError::Upstream("Issue timeline response was not valid JSON.".to_string())
        })?;

        self.cache_put(&key, &events, ttl::ISSUE_TIMELINE).await;
        Ok(events)
    }

    /// Commit history filtered to one file path
    pub async fn file_commits(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        if path.is_empty() {
            return Err(GatewayError::BadRequest(
                "A file path query parameter is required.".to_string(),
            ));
        }

        let cred = self.credential(session_user).await;
        let key = repo_key("repo:commits", &cred.scope, owner, repo)
            .param("path", path)
            .build();
        let client = self.client_for(&cred);
        self.cached_passthrough(
            &key,
            ttl::FILE_COMMITS,
            client.as_ref(),
            &format!("/repos/{owner}/{repo}/commits"),
            &[("path", path)],
            "file commit history",
        )
        .await
    }

    /// All pull requests, newest activity first; uncached passthrough
    pub async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let cred = self.credential(session_user).await;
        let client = self.client_for(&cred);
        client
            .get_json(
                &format!("/repos/{owner}/{repo}/pulls"),
                &[
                    ("state", "all"),
                    ("per_page", "100"),
                    ("sort", "updated"),
                    ("direction", "desc"),
                ],
            )
            .await
            .map_err(|e| e.describing("pull requests"))
    }

    /// Recursive file tree for a branch
    ///
    /// When the branch is absent (or the `default` sentinel), the default
    /// branch is resolved upstream first and the cache key carries the
    /// resolved name. An implicit request and a later explicit request for
    /// the same branch therefore share one cache entry.
    pub async fn tree(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        session_user: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let cred = self.credential(session_user).await;
        let requested = branch.filter(|b| !b.is_empty() && *b != DEFAULT_BRANCH_SENTINEL);

        // an explicit branch needs no resolution call before the cache check
        if let Some(b) = requested {
            let key = tree_key(&cred.scope, owner, repo, b);
            if let Some(hit) = self.cache_get::<Value>(&key).await {
                return Ok(hit);
            }
        }

        let client = self.client_for(&cred);
        let branch = match requested {
            Some(b) => b.to_string(),
            None => self.default_branch(client.as_ref(), owner, repo).await?,
        };

        let key = tree_key(&cred.scope, owner, repo, &branch);
        if let Some(hit) = self.cache_get::<Value>(&key).await {
            return Ok(hit);
        }

        let branch_info = client
            .get_json(&format!("/repos/{owner}/{repo}/branches/{branch}"), &[])
            .await
            .map_err(|e| e.describing("branch"))?;
        let tree_sha = branch_info["commit"]["commit"]["tree"]["sha"]
            .as_str()
            .ok_or_else(|| {
                GatewayError::Upstream("Branch metadata is missing a tree SHA.".to_string())
            })?
            .to_string();

        let tree = client
            .get_json(
                &format!("/repos/{owner}/{repo}/git/trees/{tree_sha}"),
                &[("recursive", "1")],
            )
            .await
            .map_err(|e| e.describing("Git tree"))?;

        self.cache_put(&key, &tree, ttl::TREE).await;
        Ok(tree)
    }

    /// Raw file content; wildcard segments are joined by the HTTP layer
    pub async fn file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        session_user: Option<&str>,
    ) -> Result<FileContent, GatewayError> {
        if path.is_empty() {
            return Err(GatewayError::BadRequest(
                "A file path is required.".to_string(),
            ));
        }

        let cred = self.credential(session_user).await;
        let client = self.client_for(&cred);
        let content = client
            .get_text(&format!("/repos/{owner}/{repo}/contents/{path}"), ACCEPT_RAW)
            .await
            .map_err(|e| e.describing("file content"))?;

        Ok(FileContent {
            content,
            file_name: path.to_string(),
            file_url: format!("https://github.com/{owner}/{repo}/blob/HEAD/{path}"),
        })
    }

    pub(crate) async fn default_branch(
        &self,
        client: &dyn UpstreamClient,
        owner: &str,
        repo: &str,
    ) -> Result<String, GatewayError> {
        let body = client
            .get_json(&format!("/repos/{owner}/{repo}"), &[])
            .await
            .map_err(|e| e.describing("repository data"))?;
        body["default_branch"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                GatewayError::Upstream(
                    "Repository metadata is missing a default branch.".to_string(),
                )
            })
    }
}

pub(crate) fn repo_key(resource: &'static str, scope: &Scope, owner: &str, repo: &str) -> ResourceKey {
    ResourceKey::new(resource, scope.clone())
        .param("owner", owner)
        .param("repo", repo)
}

fn tree_key(scope: &Scope, owner: &str, repo: &str, branch: &str) -> String {
    repo_key("repo:tree", scope, owner, repo)
        .param("branch", branch)
        .build()
}
