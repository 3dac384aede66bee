// GitHub Actions URL parsing.
// Recovers owner, repository, run and job ids from a run or job page URL.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{PipeyeError, Result};

static RUN_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([^/]+)/([^/]+)/actions/runs/(\d+)(?:/job/(\d+))?").expect("valid regex")
});

/// Location of a workflow run (and optionally one of its jobs) on github.com.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRef {
    pub owner: String,
    pub repo: String,
    pub run_id: u64,
    pub job_id: Option<u64>,
}

fn parse_github_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| PipeyeError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if url.host_str() != Some("github.com") {
        return Err(PipeyeError::InvalidUrl(format!(
            "{}: host must be github.com",
            raw
        )));
    }
    Ok(url)
}

/// Parse `https://github.com/{owner}/{repo}/actions/runs/{run}[/job/{job}]`.
pub fn parse_run_url(raw: &str) -> Result<RunRef> {
    let url = parse_github_url(raw)?;

    let invalid = || PipeyeError::InvalidUrl(format!("{}: not an Actions run URL", raw));
    let captures = RUN_PATH.captures(url.path()).ok_or_else(invalid)?;

    let run_id = captures[3].parse().map_err(|_| invalid())?;
    let job_id = match captures.get(4) {
        Some(job) => Some(job.as_str().parse().map_err(|_| invalid())?),
        None => None,
    };

    Ok(RunRef {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        run_id,
        job_id,
    })
}

/// Owner and repository of any github.com page inside a repository, such as a
/// job's `https://github.com/{owner}/{repo}/runs/{check_run}`.
pub fn parse_repo_url(raw: &str) -> Result<(String, String)> {
    let url = parse_github_url(raw)?;

    let mut segments = url.path_segments().into_iter().flatten();
    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(PipeyeError::InvalidUrl(format!(
            "{}: no repository in path",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_url() {
        let run = parse_run_url("https://github.com/octo-org/octo-repo/actions/runs/30433642").unwrap();
        assert_eq!(run.owner, "octo-org");
        assert_eq!(run.repo, "octo-repo");
        assert_eq!(run.run_id, 30433642);
        assert_eq!(run.job_id, None);
    }

    #[test]
    fn test_parse_job_url() {
        let run =
            parse_run_url("https://github.com/octo-org/octo-repo/actions/runs/29679449/job/399444496")
                .unwrap();
        assert_eq!(run.run_id, 29679449);
        assert_eq!(run.job_id, Some(399444496));
    }

    #[test]
    fn test_rejects_other_hosts_and_paths() {
        assert!(parse_run_url("https://gitlab.com/a/b/actions/runs/1").is_err());
        assert!(parse_run_url("https://github.com/a/b/pulls/1").is_err());
        assert!(parse_run_url("not a url").is_err());
    }

    #[test]
    fn test_parse_repo_url() {
        let parts = parse_repo_url("https://github.com/octo-org/octo-repo/runs/399444496").unwrap();
        assert_eq!(parts, ("octo-org".to_string(), "octo-repo".to_string()));

        let parts =
            parse_repo_url("https://github.com/octo-org/octo-repo/actions/runs/29679449/job/1")
                .unwrap();
        assert_eq!(parts.1, "octo-repo");

        assert!(parse_repo_url("https://github.com/octo-org").is_err());
        assert!(parse_repo_url("https://example.com/octo-org/octo-repo/runs/1").is_err());
    }
}
