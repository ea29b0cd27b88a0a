//! Credential resolution
//!
//! Turns an opaque session identity into the token and cache scope used for
//! one request. Absence of identity is never an error: it degrades to the
//! anonymous (public) view, as does a failing user store.

use async_trait::async_trait;
use log::{debug, warn};
use repolens_cache::Scope;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of the user-record store
///
/// The gateway only ever asks one question: does this user have a stored
/// GitHub access token?
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_token(&self, user_id: &str) -> anyhow::Result<Option<String>>;
}

/// User store backed by a fixed id → token map
///
/// Loadable from a TOML file with a `[tokens]` table. This stands in for
/// the real user database, which is outside this subsystem.
#[derive(Debug, Default)]
pub struct StaticUserStore {
    tokens: HashMap<String, String>,
}

#[derive(Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: HashMap<String, String>,
}

impl StaticUserStore {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Parse a `[tokens]` table, e.g. `alice = "ghp_..."`
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let file: TokenFile = toml::from_str(content)?;
        Ok(Self {
            tokens: file.tokens,
        })
    }
}

#[async_trait]
impl UserStore for StaticUserStore {
    async fn find_token(&self, user_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .tokens
            .get(user_id)
            .filter(|t| !t.is_empty())
            .cloned())
    }
}

/// Token and cache scope resolved for one inbound request
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub token: Option<String>,
    pub scope: Scope,
}

impl ResolvedCredential {
    pub fn public(token: Option<String>) -> Self {
        Self {
            token,
            scope: Scope::Public,
        }
    }
}

/// Picks the credential context for each request
///
/// A server-wide fallback token may serve anonymous callers; it represents
/// the gateway's own identity, so the scope stays `public` and the cached
/// view is shared by every anonymous caller.
pub struct CredentialResolver {
    store: Arc<dyn UserStore>,
    fallback_token: Option<String>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn UserStore>, fallback_token: Option<String>) -> Self {
        Self {
            store,
            fallback_token,
        }
    }

    /// Resolve the session identity to a credential, at most one store lookup
    pub async fn resolve(&self, session_user: Option<&str>) -> ResolvedCredential {
        if let Some(user_id) = session_user {
            match self.store.find_token(user_id).await {
                Ok(Some(token)) => {
                    debug!("authenticated GitHub request for user {}", user_id);
                    return ResolvedCredential {
                        token: Some(token),
                        scope: Scope::User(user_id.to_string()),
                    };
                }
                Ok(None) => {
                    debug!("user {} has no stored token, falling back", user_id);
                }
                Err(e) => {
                    // availability of read access beats personalization
                    warn!("user store lookup failed for {}: {}", user_id, e);
                }
            }
        } else {
            debug!("unauthenticated GitHub request");
        }

        ResolvedCredential::public(self.fallback_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_token(&self, _user_id: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("store unavailable"))
        }
    }

    fn store_with(user: &str, token: &str) -> Arc<StaticUserStore> {
        let mut tokens = HashMap::new();
        tokens.insert(user.to_string(), token.to_string());
        Arc::new(StaticUserStore::new(tokens))
    }

    #[tokio::test]
    async fn test_resolves_user_token_and_scope() {
        let resolver = CredentialResolver::new(store_with("alice", "tok-a"), None);
        let cred = resolver.resolve(Some("alice")).await;
        assert_eq!(cred.token.as_deref(), Some("tok-a"));
        assert_eq!(cred.scope, Scope::User("alice".to_string()));
    }

    #[tokio::test]
    async fn test_absent_identity_is_public() {
        let resolver = CredentialResolver::new(Arc::new(StaticUserStore::default()), None);
        let cred = resolver.resolve(None).await;
        assert_eq!(cred.token, None);
        assert_eq!(cred.scope, Scope::Public);
    }

    #[tokio::test]
    async fn test_unknown_user_falls_back_to_public() {
        let resolver = CredentialResolver::new(store_with("alice", "tok-a"), None);
        let cred = resolver.resolve(Some("bob")).await;
        assert_eq!(cred.token, None);
        assert_eq!(cred.scope, Scope::Public);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_anonymous() {
        let resolver = CredentialResolver::new(Arc::new(FailingStore), None);
        let cred = resolver.resolve(Some("alice")).await;
        assert_eq!(cred.token, None);
        assert_eq!(cred.scope, Scope::Public);
    }

    #[tokio::test]
    async fn test_fallback_token_keeps_public_scope() {
        let resolver =
            CredentialResolver::new(Arc::new(StaticUserStore::default()), Some("srv".into()));
        let cred = resolver.resolve(None).await;
        assert_eq!(cred.token.as_deref(), Some("srv"));
        assert_eq!(cred.scope, Scope::Public);
    }

    #[tokio::test]
    async fn test_empty_stored_token_is_ignored() {
        let resolver = CredentialResolver::new(store_with("alice", ""), None);
        let cred = resolver.resolve(Some("alice")).await;
        assert_eq!(cred.token, None);
        assert_eq!(cred.scope, Scope::Public);
    }

    #[test]
    fn test_token_file_parsing() {
        let store = StaticUserStore::from_toml_str(
            r#"
            [tokens]
            alice = "ghp_abc"
            "#,
        )
        .unwrap();
        assert_eq!(store.tokens.get("alice").map(String::as_str), Some("ghp_abc"));
    }
}
