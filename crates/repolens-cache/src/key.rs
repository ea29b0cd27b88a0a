//! Scoped cache-key construction
//!
//! All handlers build keys through `ResourceKey` instead of formatting
//! strings at the call site. Two requests for the same resource, scope and
//! parameters always produce the identical key string; different scopes can
//! never collide because the scope segment is part of every key.

use std::fmt;

/// Identity scope a cache entry belongs to
///
/// `Public` covers anonymous callers (including requests served with a
/// server-wide fallback token, which is the same view for everyone).
/// `User` partitions entries per authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Public,
    User(String),
}

impl Scope {
    /// The label used in the key string
    pub fn label(&self) -> &str {
        match self {
            Scope::Public => "public",
            Scope::User(id) => id,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed descriptor for a cacheable resource
///
/// Rendered as `{resource}:{scope}:{k=v}:{k=v}...` with parameters sorted
/// by name, so parameter ordering at the call site cannot change the key.
#[derive(Debug, Clone)]
pub struct ResourceKey {
    resource: &'static str,
    scope: Scope,
    params: Vec<(&'static str, String)>,
}

impl ResourceKey {
    pub fn new(resource: &'static str, scope: Scope) -> Self {
        Self {
            resource,
            scope,
            params: Vec::new(),
        }
    }

    /// Add a path/query parameter that identifies the resource
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Render the deterministic key string
    pub fn build(&self) -> String {
        let mut params = self.params.clone();
        params.sort_by(|a, b| a.0.cmp(b.0));

        let mut key = format!("{}:{}", self.resource, self.scope.label());
        for (name, value) in &params {
            key.push(':');
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic_across_param_order() {
        let a = ResourceKey::new("repo:tree", Scope::Public)
            .param("owner", "rust-lang")
            .param("repo", "rust")
            .param("branch", "master")
            .build();
        let b = ResourceKey::new("repo:tree", Scope::Public)
            .param("branch", "master")
            .param("repo", "rust")
            .param("owner", "rust-lang")
            .build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = ResourceKey::new("repo", Scope::Public)
            .param("owner", "octocat")
            .param("repo", "hello-world")
            .build();
        assert_eq!(key, "repo:public:owner=octocat:repo=hello-world");
    }

    #[test]
    fn test_scope_partitions_keys() {
        let public = ResourceKey::new("repo:issues", Scope::Public)
            .param("owner", "o")
            .param("repo", "r")
            .build();
        let user_a = ResourceKey::new("repo:issues", Scope::User("a".into()))
            .param("owner", "o")
            .param("repo", "r")
            .build();
        let user_b = ResourceKey::new("repo:issues", Scope::User("b".into()))
            .param("owner", "o")
            .param("repo", "r")
            .build();
        assert_ne!(public, user_a);
        assert_ne!(user_a, user_b);
    }

    #[test]
    fn test_scope_label() {
        assert_eq!(Scope::Public.label(), "public");
        assert_eq!(Scope::User("42".into()).label(), "42");
    }
}
