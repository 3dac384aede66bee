// Cache module for local filesystem caching.
// Stores parsed API results and raw log archives to avoid repeat downloads.

pub mod paths;
pub mod store;

pub use paths::{cache_dir, config_dir, hash_key};
pub use store::{CacheEntry, CachePayload, CacheStore};
