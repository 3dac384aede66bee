// pipeye: data core of a GitHub Actions terminal dashboard.
// Fetches repositories, workflows, runs and jobs concurrently, caches them locally,
// and extracts per-step logs from run log archives.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod github;
pub mod logs;

pub use cache::CacheStore;
pub use config::{Config, FetchOptions};
pub use error::{PipeyeError, Result};
pub use fetch::{Fetcher, RepositoryNode, Row, RowData, RunNode, WorkflowNode};
pub use github::{ActionsApi, GitHubClient};
pub use logs::{LogEntry, LogLevel, StepLog};
