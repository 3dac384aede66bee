// Runtime configuration.
// Token, watched repositories, and tuning knobs for fetching and caching.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::paths;
use crate::error::{PipeyeError, Result};

/// Tuning for the fetch orchestrator and its cache usage.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Capacity of each fan-out level's worker pool.
    pub concurrency: usize,
    /// Deadline applied to every top-level fetch.
    pub timeout: Duration,
    pub workflows_per_page: u32,
    /// How many recent runs to load per workflow.
    pub runs_per_workflow: u32,
    pub jobs_per_page: u32,
    /// Page size when looking up step metadata for log parsing.
    pub step_jobs_per_page: u32,
    /// TTL of downloaded log archives.
    pub archive_ttl: Duration,
    /// TTL of parsed step logs; parsing is cheap to redo, downloading is not.
    pub parsed_logs_ttl: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(10),
            workflows_per_page: 20,
            runs_per_workflow: 20,
            jobs_per_page: 10,
            step_jobs_per_page: 100,
            archive_ttl: Duration::from_secs(60 * 60),
            parsed_logs_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// On-disk configuration file contents.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    repositories: Vec<String>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the GitHub API.
    pub token: String,
    /// Watched repositories as `owner/repo`.
    pub repositories: Vec<String>,
    pub fetch: FetchOptions,
}

impl Config {
    pub fn new(token: impl Into<String>, repositories: Vec<String>) -> Self {
        Self {
            token: token.into(),
            repositories,
            fetch: FetchOptions::default(),
        }
    }

    /// Token from GITHUB_TOKEN plus the given repositories, validated.
    pub fn from_env(repositories: Vec<String>) -> Result<Self> {
        let config = Self::new(token_from_env()?, repositories);
        config.validate()?;
        Ok(config)
    }

    /// Load the config file from the platform config directory, with the token
    /// taken from GITHUB_TOKEN.
    pub fn load() -> Result<Self> {
        let token = token_from_env()?;
        let path = config_path()
            .ok_or_else(|| PipeyeError::Config("no config directory for this platform".into()))?;
        Self::from_file(&path, token)
    }

    /// Read repositories from a JSON config file and validate the result.
    ///
    /// A missing file is replaced by an empty default and reported as an error
    /// naming its location, so the user can fill it in.
    pub fn from_file(path: &Path, token: impl Into<String>) -> Result<Self> {
        if !path.exists() {
            write_default_config(path)?;
            return Err(PipeyeError::Config(format!(
                "created default config at {}; add repositories as \"owner/repo\"",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&contents)?;

        let config = Self::new(token, file.repositories);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(PipeyeError::MissingToken);
        }
        if self.repositories.is_empty() {
            return Err(PipeyeError::Config("no repositories configured".into()));
        }
        for name in &self.repositories {
            parse_full_name(name)?;
        }
        if self.fetch.concurrency == 0 {
            return Err(PipeyeError::Config("concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

/// Read the API token from GITHUB_TOKEN; missing or empty is fatal.
pub fn token_from_env() -> Result<String> {
    std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
        .ok_or(PipeyeError::MissingToken)
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(&ConfigFile::default())?;
    fs::write(path, contents)?;
    info!(path = %path.display(), "created default config");
    Ok(())
}

/// Path to the config file (~/.config/pipeye/config.json on Linux).
pub fn config_path() -> Option<PathBuf> {
    paths::config_dir().map(|dir| dir.join("config.json"))
}

/// Split `owner/repo` into its two non-empty parts.
pub fn parse_full_name(name: &str) -> Result<(String, String)> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(PipeyeError::InvalidRepositoryName(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_name() {
        assert_eq!(
            parse_full_name("rust-lang/rust").unwrap(),
            ("rust-lang".to_string(), "rust".to_string())
        );
        assert!(parse_full_name("rust").is_err());
        assert!(parse_full_name("a/b/c").is_err());
        assert!(parse_full_name("/repo").is_err());
        assert!(parse_full_name("owner/").is_err());
    }

    #[test]
    fn test_defaults() {
        let options = FetchOptions::default();
        assert_eq!(options.concurrency, 10);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.runs_per_workflow, 20);
        assert!(options.parsed_logs_ttl < options.archive_ttl);
    }

    #[test]
    fn test_validate() {
        let config = Config::new("token", vec!["a/b".to_string()]);
        assert!(config.validate().is_ok());

        let config = Config::new("", vec!["a/b".to_string()]);
        assert!(matches!(config.validate(), Err(PipeyeError::MissingToken)));

        let config = Config::new("token", vec![]);
        assert!(config.validate().is_err());

        let config = Config::new("token", vec!["a/b".to_string(), "bad".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(PipeyeError::InvalidRepositoryName(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "repositories": ["a/b", "c/d"] }"#).unwrap();

        let config = Config::from_file(&path, "token").unwrap();
        assert_eq!(config.repositories, vec!["a/b", "c/d"]);
    }

    #[test]
    fn test_from_env() {
        let previous = std::env::var("GITHUB_TOKEN").ok();

        // SAFETY: no other test reads or writes GITHUB_TOKEN
        unsafe { std::env::remove_var("GITHUB_TOKEN") };
        let result = Config::from_env(vec!["a/b".to_string()]);
        assert!(matches!(result, Err(PipeyeError::MissingToken)));

        unsafe { std::env::set_var("GITHUB_TOKEN", "") };
        let result = Config::from_env(vec!["a/b".to_string()]);
        assert!(matches!(result, Err(PipeyeError::MissingToken)));

        unsafe { std::env::set_var("GITHUB_TOKEN", "ghp_test") };
        let config = Config::from_env(vec!["a/b".to_string()]).unwrap();
        assert_eq!(config.token, "ghp_test");
        assert_eq!(config.repositories, vec!["a/b"]);
        assert!(Config::from_env(vec!["bad".to_string()]).is_err());

        match previous {
            Some(token) => unsafe { std::env::set_var("GITHUB_TOKEN", token) },
            None => unsafe { std::env::remove_var("GITHUB_TOKEN") },
        }
    }

    #[test]
    fn test_missing_file_creates_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeye").join("config.json");

        let err = Config::from_file(&path, "token").unwrap_err();
        assert!(matches!(err, PipeyeError::Config(ref msg) if msg.contains("config.json")));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({ "repositories": [] }));

        // The default exists now but lists nothing yet
        let err = Config::from_file(&path, "token").unwrap_err();
        assert!(matches!(err, PipeyeError::Config(ref msg) if msg.contains("no repositories")));
    }

    #[test]
    fn test_from_file_rejects_empty_list() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        assert!(Config::from_file(&path, "token").is_err());
    }
}
