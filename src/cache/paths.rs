// Cache path utilities.
// Resolves the platform cache directory and names index and blob files by hashed key.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

/// Name of the JSON index file inside the cache directory.
pub const INDEX_FILE: &str = "cache.json";

/// Extension used for blob-tier files (raw log archives).
pub const BLOB_EXTENSION: &str = "zip";

/// Get the base cache directory (~/.cache/pipeye on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pipeye").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the configuration directory (~/.config/pipeye on Linux).
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pipeye").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path to the index file within a cache directory.
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

/// Path to the blob file for an already-hashed key.
pub fn blob_path(dir: &Path, digest: &str) -> PathBuf {
    dir.join(format!("{}.{}", digest, BLOB_EXTENSION))
}

/// Hex SHA-256 digest of an application cache key.
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
