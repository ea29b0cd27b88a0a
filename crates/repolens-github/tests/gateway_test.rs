//! Gateway behavior against in-memory collaborators
//!
//! Exercises the cache flow, scope isolation, error mapping, and the
//! fan-out call plans with a canned upstream and registry.

use async_trait::async_trait;
use repolens_github::{
    CredentialResolver, Gateway, GatewayError, MemoryCache, PackageInfo, PackageRegistry,
    StaticUserStore, UpstreamClient, UpstreamFactory,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Canned upstream: routes keyed by `path?query`, every call recorded
#[derive(Clone, Default)]
struct MockUpstream {
    json_routes: Arc<Mutex<HashMap<String, Value>>>,
    text_routes: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    fn route_json(&self, key: &str, body: Value) {
        self.json_routes
            .lock()
            .unwrap()
            .insert(key.to_string(), body);
    }

    fn route_text(&self, key: &str, body: &str) {
        self.text_routes
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, key: &str) {
        self.calls.lock().unwrap().push(key.to_string());
    }
}

fn key_for(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        let joined: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", path, joined.join("&"))
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, GatewayError> {
        let key = key_for(path, query);
        self.record(&key);
        self.json_routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| GatewayError::from_status(404, "resource"))
    }

    async fn get_text(&self, path: &str, _accept: &str) -> Result<String, GatewayError> {
        self.record(path);
        self.text_routes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| GatewayError::from_status(404, "resource"))
    }

    async fn get_url_json(&self, url: &str) -> Result<Value, GatewayError> {
        self.record(url);
        self.json_routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| GatewayError::from_status(404, "resource"))
    }
}

/// Factory that hands out the shared mock and records resolved tokens
#[derive(Clone)]
struct MockFactory {
    upstream: MockUpstream,
    tokens_seen: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockFactory {
    fn new(upstream: MockUpstream) -> Self {
        Self {
            upstream,
            tokens_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl UpstreamFactory for MockFactory {
    fn build(&self, token: Option<&str>) -> Arc<dyn UpstreamClient> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(token.map(String::from));
        Arc::new(self.upstream.clone())
    }
}

#[derive(Default)]
struct MockRegistry {
    packages: HashMap<String, PackageInfo>,
}

impl MockRegistry {
    fn with(mut self, name: &str, latest: &str, license: Option<&str>, deprecated: bool) -> Self {
        self.packages.insert(
            name.to_string(),
            PackageInfo {
                latest: latest.to_string(),
                license: license.map(String::from),
                deprecated,
            },
        );
        self
    }
}

#[async_trait]
impl PackageRegistry for MockRegistry {
    async fn lookup(&self, name: &str) -> Result<PackageInfo, GatewayError> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::from_status(404, "package"))
    }
}

fn gateway_with(
    upstream: &MockUpstream,
    registry: MockRegistry,
    user_tokens: &[(&str, &str)],
) -> Gateway {
    let tokens: HashMap<String, String> = user_tokens
        .iter()
        .map(|(u, t)| (u.to_string(), t.to_string()))
        .collect();
    Gateway::new(
        Arc::new(MemoryCache::new()),
        CredentialResolver::new(Arc::new(StaticUserStore::new(tokens)), None),
        Arc::new(MockFactory::new(upstream.clone())),
        Arc::new(registry),
    )
}

#[tokio::test]
async fn test_second_identical_request_hits_cache() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/octocat/hello", json!({ "name": "hello", "stars": 42 }));
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let first = gateway.repo_details("octocat", "hello", None).await.unwrap();
    let second = gateway.repo_details("octocat", "hello", None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn test_scopes_do_not_share_cache_entries() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/o/r", json!({ "name": "r" }));
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[("alice", "tok-a")]);

    gateway.repo_details("o", "r", Some("alice")).await.unwrap();
    gateway.repo_details("o", "r", None).await.unwrap();
    // each scope misses once...
    assert_eq!(upstream.call_count(), 2);

    gateway.repo_details("o", "r", Some("alice")).await.unwrap();
    gateway.repo_details("o", "r", None).await.unwrap();
    // ...then hits its own entry
    assert_eq!(upstream.call_count(), 2);
}

#[tokio::test]
async fn test_upstream_404_maps_to_not_found_and_is_not_cached() {
    let upstream = MockUpstream::default();
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let err = gateway.repo_details("ghost", "nope", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
    assert_eq!(err.status(), 404);

    // failure was not cached: the retry reaches upstream again
    let _ = gateway.repo_details("ghost", "nope", None).await;
    assert_eq!(upstream.call_count(), 2);
}

#[tokio::test]
async fn test_issues_returns_open_and_closed() {
    let upstream = MockUpstream::default();
    upstream.route_json(
        "/repos/o/r/issues?state=open&per_page=50",
        json!([{ "number": 1 }]),
    );
    upstream.route_json(
        "/repos/o/r/issues?state=closed&per_page=50",
        json!([{ "number": 2 }, { "number": 3 }]),
    );
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let payload = gateway.issues("o", "r", None).await.unwrap();
    assert_eq!(payload.open.as_array().unwrap().len(), 1);
    assert_eq!(payload.closed.as_array().unwrap().len(), 2);

    // cached as one entry
    gateway.issues("o", "r", None).await.unwrap();
    assert_eq!(upstream.call_count(), 2);
}

#[tokio::test]
async fn test_tree_default_branch_shares_cache_with_explicit_request() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/o/r", json!({ "default_branch": "main" }));
    upstream.route_json(
        "/repos/o/r/branches/main",
        json!({ "commit": { "commit": { "tree": { "sha": "T123" } } } }),
    );
    upstream.route_json(
        "/repos/o/r/git/trees/T123?recursive=1",
        json!({ "sha": "T123", "tree": [{ "path": "src/lib.rs" }] }),
    );
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let implicit = gateway.tree("o", "r", None, None).await.unwrap();
    let explicit = gateway.tree("o", "r", Some("main"), None).await.unwrap();
    assert_eq!(implicit, explicit);

    let tree_fetches = upstream
        .calls()
        .iter()
        .filter(|c| c.starts_with("/repos/o/r/git/trees/"))
        .count();
    assert_eq!(tree_fetches, 1);
}

#[tokio::test]
async fn test_tree_sentinel_means_default_branch() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/o/r", json!({ "default_branch": "trunk" }));
    upstream.route_json(
        "/repos/o/r/branches/trunk",
        json!({ "commit": { "commit": { "tree": { "sha": "S" } } } }),
    );
    upstream.route_json("/repos/o/r/git/trees/S?recursive=1", json!({ "tree": [] }));
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    gateway.tree("o", "r", Some("default"), None).await.unwrap();
    assert!(upstream.calls().contains(&"/repos/o/r/branches/trunk".to_string()));
}

#[tokio::test]
async fn test_deployments_tolerate_failed_status_fetch_and_dedup_homepage() {
    let upstream = MockUpstream::default();
    upstream.route_json(
        "/repos/o/r",
        json!({ "homepage": "https://app.example.com", "created_at": "2020-01-01T00:00:00Z" }),
    );
    upstream.route_json(
        "/repos/o/r/deployments",
        json!([
            {
                "id": 1,
                "environment": "production",
                "created_at": "2024-01-01T00:00:00Z",
                "statuses_url": "https://api.github.test/statuses/1",
            },
            {
                "id": 2,
                "environment": "staging",
                "created_at": "2024-01-02T00:00:00Z",
                "statuses_url": "https://api.github.test/statuses/2",
            },
        ]),
    );
    // staging's status history is not routed, so that fetch fails
    upstream.route_json(
        "https://api.github.test/statuses/1",
        json!([{ "state": "success", "environment_url": "https://app.example.com" }]),
    );
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let entries = gateway.deployments("o", "r", None).await.unwrap();
    // production survives, staging is dropped, homepage dedups by URL
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].environment, "production");
    assert_eq!(entries[0].url, "https://app.example.com");
}

#[tokio::test]
async fn test_deployments_missing_endpoint_is_empty_result() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/o/r", json!({ "homepage": null }));
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let entries = gateway.deployments("o", "r", None).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_hotspots_drop_failed_commit_details() {
    let upstream = MockUpstream::default();
    upstream.route_json(
        "/repos/o/r/commits?per_page=100",
        json!([
            { "url": "https://api.github.test/commits/1" },
            { "url": "https://api.github.test/commits/2" },
            { "url": "https://api.github.test/commits/3" },
        ]),
    );
    upstream.route_json(
        "https://api.github.test/commits/1",
        json!({ "files": [{ "filename": "src/lib.rs" }] }),
    );
    upstream.route_json(
        "https://api.github.test/commits/2",
        json!({ "files": [{ "filename": "src/lib.rs" }, { "filename": "docs/a.md" }] }),
    );
    // commit 3 fails and is silently dropped
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let ranked = gateway.hotspots("o", "r", None).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].path, "src/lib.rs");
    assert_eq!(ranked[0].churn, 2);
}

#[tokio::test]
async fn test_dependency_health_marks_errors_and_summarizes_survivors() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/o/r", json!({ "default_branch": "main" }));
    upstream.route_json(
        "/repos/o/r/git/trees/main?recursive=1",
        json!({ "tree": [{ "path": "package.json" }] }),
    );
    upstream.route_text(
        "/repos/o/r/contents/package.json",
        r#"{ "dependencies": { "left-pad": "^1.0.0" }, "devDependencies": { "broken": "^9.9.9" } }"#,
    );
    let registry = MockRegistry::default().with("left-pad", "1.3.0", Some("MIT"), false);
    let gateway = gateway_with(&upstream, registry, &[]);

    let report = gateway.dependency_health("o", "r", None).await.unwrap();
    let repolens_github::DependencyReport::Report {
        dependencies,
        summary,
    } = report
    else {
        panic!("expected a full report");
    };

    assert_eq!(dependencies.len(), 2);
    let broken = dependencies.iter().find(|d| d.name == "broken").unwrap();
    assert!(broken.error.is_some());
    let left_pad = dependencies.iter().find(|d| d.name == "left-pad").unwrap();
    assert_eq!(left_pad.is_outdated, Some(true));
    assert_eq!(left_pad.is_deprecated, Some(false));

    assert_eq!(summary.total, 2);
    assert_eq!(summary.outdated, 1);
    assert_eq!(summary.deprecated, 0);
    assert_eq!(summary.licenses, vec!["MIT"]);
}

#[tokio::test]
async fn test_dependency_health_without_manifest() {
    let upstream = MockUpstream::default();
    upstream.route_json("/repos/o/r", json!({ "default_branch": "main" }));
    upstream.route_json(
        "/repos/o/r/git/trees/main?recursive=1",
        json!({ "tree": [{ "path": "Cargo.toml" }] }),
    );
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let report = gateway.dependency_health("o", "r", None).await.unwrap();
    assert!(matches!(report, repolens_github::DependencyReport::Missing { .. }));
}

#[tokio::test]
async fn test_file_commits_requires_path() {
    let upstream = MockUpstream::default();
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let err = gateway.file_commits("o", "r", "", None).await.unwrap_err();
    assert!(matches!(err, GatewayError::BadRequest(_)));
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_file_content_uses_raw_media_type_response() {
    let upstream = MockUpstream::default();
    upstream.route_text("/repos/o/r/contents/src/app.js", "console.log('hi');");
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let file = gateway
        .file_content("o", "r", "src/app.js", None)
        .await
        .unwrap();
    assert_eq!(file.content, "console.log('hi');");
    assert_eq!(file.file_name, "src/app.js");
    assert_eq!(file.file_url, "https://github.com/o/r/blob/HEAD/src/app.js");
}

#[tokio::test]
async fn test_pr_insights_are_not_cached() {
    let upstream = MockUpstream::default();
    upstream.route_json(
        "/repos/o/r/pulls?state=closed&per_page=100",
        json!([
            { "created_at": "2024-01-01T00:00:00Z", "merged_at": "2024-01-01T02:00:00Z" },
            { "created_at": "2024-01-01T00:00:00Z", "merged_at": null },
        ]),
    );
    let gateway = gateway_with(&upstream, MockRegistry::default(), &[]);

    let insights = gateway.pr_insights("o", "r", None).await.unwrap();
    assert_eq!(insights.total_closed, 2);
    assert_eq!(insights.merged_count, 1);
    assert_eq!(insights.acceptance_rate, 50);

    gateway.pr_insights("o", "r", None).await.unwrap();
    // computed fresh each call
    assert_eq!(upstream.call_count(), 2);
}
