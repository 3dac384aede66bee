// GitHub API module.
// Provides client, types and the Actions API trait used by the fetch orchestrator.

pub mod api;
pub mod client;
pub mod endpoints;
pub mod types;
pub mod run_url;

pub use api::ActionsApi;
pub use client::GitHubClient;
pub use types::*;
pub use run_url::{RunRef, parse_repo_url, parse_run_url};
