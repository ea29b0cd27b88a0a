//! TTL response cache for the RepoLens gateway
//!
//! This crate provides the cache side of the gateway: a `CacheStore` trait
//! that handlers talk to, an in-memory implementation with per-entry
//! expiration, and the scoped cache-key builder.
//!
//! The key builder is the single place where cache keys are constructed.
//! Every key carries the caller scope (`public` or a user id), which is what
//! keeps one caller's authenticated responses from leaking into another
//! caller's cache reads.

pub mod key;
pub mod memory;
pub mod store;

pub use key::{ResourceKey, Scope};
pub use memory::MemoryCache;
pub use store::{CacheStats, CacheStore};
