//! Cached pass-through gateway for the GitHub REST API
//!
//! This crate turns many upstream GitHub calls into cached, rate-limit
//! aware, session-scoped responses. The moving parts:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Gateway                          │
//! │  repo / tree / issues / deployments / hotspots / ...  │
//! └──────────────────────────────────────────────────────┘
//!     │              │                │             │
//!     ▼              ▼                ▼             ▼
//! CredentialResolver CacheStore  UpstreamFactory  PackageRegistry
//!  (UserStore)       (TTL cache)  (reqwest)       (npm)
//! ```
//!
//! Every collaborator sits behind a trait, so the whole gateway runs
//! against in-memory fakes in tests. Handlers share one flow: resolve
//! credential, build a scoped cache key, read through the cache, execute
//! the call plan on a miss, write back with the resource's TTL. Fan-out
//! plans settle every sub-call and tolerate individual failures.

pub mod aggregate;
pub mod credentials;
pub mod dependencies;
pub mod deployments;
pub mod error;
pub mod gateway;
pub mod hotspots;
pub mod insights;
pub mod registry;
pub mod timeline;
pub mod ttl;
pub mod upstream;

pub use credentials::{CredentialResolver, ResolvedCredential, StaticUserStore, UserStore};
pub use dependencies::{DependencyReport, DependencyStatus, DependencySummary};
pub use deployments::DeploymentEntry;
pub use error::GatewayError;
pub use gateway::{FileContent, Gateway, IssuesPayload, DEFAULT_BRANCH_SENTINEL};
pub use hotspots::Hotspot;
pub use insights::PrInsights;
pub use registry::{NpmRegistry, PackageInfo, PackageRegistry, NPM_REGISTRY_BASE};
pub use timeline::{RepoTimeline, TimelineCommit};
pub use upstream::{HttpFactory, UpstreamClient, UpstreamFactory, GITHUB_API_BASE};

// Re-export cache types so the server binary only needs this crate
pub use repolens_cache::{CacheStore, MemoryCache, ResourceKey, Scope};
