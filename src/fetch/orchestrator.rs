// Fetch orchestrator.
// Walks repository → workflow → run → job with bounded fan-out, and serves parsed job logs through the cache.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::{FetchOptions, parse_full_name};
use crate::error::{PipeyeError, Result};
use crate::github::{ActionsApi, Job, Step, Workflow, WorkflowRun, parse_repo_url};
use crate::logs::{StepLog, parse_archive};

use super::graph::{RepositoryNode, RunNode, WorkflowNode};
use super::pool::WorkerPool;

/// Run a remote call, failing it if the operation deadline passes first.
/// The call's future is dropped at the deadline, which cancels the request.
async fn within<T>(deadline: Instant, request: impl Future<Output = Result<T>>) -> Result<T> {
    timeout_at(deadline, request)
        .await
        .map_err(|_| PipeyeError::DeadlineExceeded)?
}

/// Cache key of a parsed job log.
fn parsed_logs_key(owner: &str, repo: &str, run_id: u64, attempt: u64, job_name: &str) -> String {
    format!("logs:{}:{}:{}:{}:{}", owner, repo, run_id, attempt, job_name)
}

/// Cache key of a run attempt's raw log archive.
fn archive_key(owner: &str, repo: &str, run_id: u64, attempt: u64) -> String {
    format!("logs:{}:{}:{}:{}", owner, repo, run_id, attempt)
}

struct Inner<A> {
    api: A,
    cache: Option<Arc<CacheStore>>,
    options: FetchOptions,
    repositories: WorkerPool,
    workflows: WorkerPool,
    runs: WorkerPool,
}

/// Assembles the Actions object graph and job logs from an [`ActionsApi`].
///
/// Cheap to clone; clones share the API client, cache and worker pools.
pub struct Fetcher<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Fetcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ActionsApi> Fetcher<A> {
    /// Create a fetcher. Without a cache every log request downloads and parses.
    pub fn new(api: A, cache: Option<Arc<CacheStore>>, options: FetchOptions) -> Self {
        let pool = || WorkerPool::new(options.concurrency);
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                repositories: pool(),
                workflows: pool(),
                runs: pool(),
                options,
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn options(&self) -> &FetchOptions {
        &self.inner.options
    }

    /// Fetch each named repository and its workflow graph, newest update first.
    ///
    /// Names that are malformed or fail to load are logged and left out; a failed
    /// workflow list is attached to its repository instead.
    pub async fn fetch_repositories_with_workflows(&self, names: &[String]) -> Vec<RepositoryNode> {
        let deadline = Instant::now() + self.inner.options.timeout;
        let start = Instant::now();
        info!(count = names.len(), "fetching repositories with workflows");

        let fetcher = self.clone();
        let mut repositories: Vec<RepositoryNode> = self
            .inner
            .repositories
            .map(names.to_vec(), move |name| {
                let fetcher = fetcher.clone();
                async move { fetcher.repository_with_workflows(&name, deadline).await }
            })
            .await
            .into_iter()
            .flatten()
            .collect();

        repositories.sort_by(|a, b| b.repository.updated_at.cmp(&a.repository.updated_at));
        info!(
            count = repositories.len(),
            elapsed = ?start.elapsed(),
            "fetched repositories with workflows"
        );
        repositories
    }

    /// Fetch a repository's workflows, each with its recent runs and their jobs.
    pub async fn fetch_workflows_with_runs(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<WorkflowNode>> {
        let deadline = Instant::now() + self.inner.options.timeout;
        self.workflows_with_runs(owner, repo, deadline).await
    }

    /// Parsed step logs of one job in a run attempt.
    ///
    /// Parsed results and raw archives are cached separately, so another job of the
    /// same attempt reuses the downloaded archive.
    pub async fn get_logs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
        job_name: &str,
    ) -> Result<Vec<StepLog>> {
        let deadline = Instant::now() + self.inner.options.timeout;
        let key = parsed_logs_key(owner, repo, run_id, attempt, job_name);

        if let Some(cache) = &self.inner.cache {
            match cache.get::<Vec<StepLog>>(&key) {
                Ok(Some(logs)) => {
                    debug!(key = %key, "parsed logs cache hit");
                    return Ok(logs);
                }
                Ok(None) => debug!(key = %key, "parsed logs cache miss"),
                Err(e) => warn!(key = %key, error = %e, "cache read failed, fetching logs"),
            }
        }

        let archive = self
            .log_archive(owner, repo, run_id, attempt, deadline)
            .await?;
        let steps = self
            .step_metadata(owner, repo, run_id, attempt, job_name, deadline)
            .await?;
        let logs = parse_archive(&archive, &steps, job_name)?;

        if let Some(cache) = &self.inner.cache {
            if let Err(e) = cache.set(&key, &logs, self.inner.options.parsed_logs_ttl) {
                warn!(key = %key, error = %e, "failed to cache parsed logs");
            }
        }

        Ok(logs)
    }

    /// Parsed step logs for a job, taking the repository from the job's page URL.
    pub async fn fetch_job_logs(&self, job: &Job) -> Result<Vec<StepLog>> {
        let (owner, repo) = parse_repo_url(&job.html_url)?;
        let attempt = job.run_attempt.unwrap_or(1);
        self.get_logs(&owner, &repo, job.run_id, attempt, &job.name)
            .await
    }

    async fn repository_with_workflows(
        &self,
        name: &str,
        deadline: Instant,
    ) -> Option<RepositoryNode> {
        let (owner, repo) = match parse_full_name(name) {
            Ok(parts) => parts,
            Err(e) => {
                warn!(repository = name, error = %e, "skipping repository");
                return None;
            }
        };

        let repository = match within(deadline, self.inner.api.get_repo(&owner, &repo)).await {
            Ok(repository) => repository,
            Err(e) => {
                warn!(repository = name, error = %e, "failed to fetch repository");
                return None;
            }
        };

        // Follow renames: the API answers for the canonical name
        let (owner, repo) = parse_full_name(&repository.full_name).unwrap_or((owner, repo));

        let (workflows, error) = match self.workflows_with_runs(&owner, &repo, deadline).await {
            Ok(workflows) => (workflows, None),
            Err(e) => {
                warn!(repository = name, error = %e, "failed to fetch workflows");
                (Vec::new(), Some(e.to_string()))
            }
        };

        Some(RepositoryNode {
            repository,
            workflows,
            error,
        })
    }

    async fn workflows_with_runs(
        &self,
        owner: &str,
        repo: &str,
        deadline: Instant,
    ) -> Result<Vec<WorkflowNode>> {
        let (workflows, _) = within(
            deadline,
            self.inner
                .api
                .get_workflows(owner, repo, 1, self.inner.options.workflows_per_page),
        )
        .await?;
        debug!(owner, repo, count = workflows.len(), "fetched workflows");

        let fetcher = self.clone();
        let (owner, repo) = (owner.to_string(), repo.to_string());
        let nodes = self
            .inner
            .workflows
            .map(workflows, move |workflow| {
                let fetcher = fetcher.clone();
                let (owner, repo) = (owner.clone(), repo.clone());
                async move {
                    fetcher
                        .workflow_with_runs(&owner, &repo, workflow, deadline)
                        .await
                }
            })
            .await;

        Ok(nodes)
    }

    async fn workflow_with_runs(
        &self,
        owner: &str,
        repo: &str,
        workflow: Workflow,
        deadline: Instant,
    ) -> WorkflowNode {
        let request = self.inner.api.get_workflow_runs(
            owner,
            repo,
            workflow.id,
            1,
            self.inner.options.runs_per_workflow,
        );
        let runs = match within(deadline, request).await {
            Ok((runs, _)) => runs,
            Err(e) => {
                warn!(owner, repo, workflow = %workflow.name, error = %e, "failed to fetch workflow runs");
                return WorkflowNode {
                    workflow,
                    runs: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        let fetcher = self.clone();
        let (owner, repo) = (owner.to_string(), repo.to_string());
        let runs = self
            .inner
            .runs
            .map(runs, move |run| {
                let fetcher = fetcher.clone();
                let (owner, repo) = (owner.clone(), repo.clone());
                async move { fetcher.run_with_jobs(&owner, &repo, run, deadline).await }
            })
            .await;

        WorkflowNode {
            workflow,
            runs,
            error: None,
        }
    }

    async fn run_with_jobs(
        &self,
        owner: &str,
        repo: &str,
        run: WorkflowRun,
        deadline: Instant,
    ) -> RunNode {
        let request =
            self.inner
                .api
                .get_jobs(owner, repo, run.id, 1, self.inner.options.jobs_per_page);
        let jobs = match within(deadline, request).await {
            Ok((jobs, _)) => jobs,
            Err(e) => {
                debug!(owner, repo, run_id = run.id, error = %e, "failed to fetch jobs");
                Vec::new()
            }
        };

        RunNode { run, jobs }
    }

    async fn log_archive(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
        deadline: Instant,
    ) -> Result<Vec<u8>> {
        let key = archive_key(owner, repo, run_id, attempt);

        if let Some(cache) = &self.inner.cache {
            match cache.get_file(&key) {
                Ok(Some(path)) => match tokio::fs::read(&path).await {
                    Ok(archive) => {
                        debug!(key = %key, "log archive cache hit");
                        return Ok(archive);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to read cached archive"),
                },
                Ok(None) => debug!(key = %key, "log archive cache miss"),
                Err(e) => warn!(key = %key, error = %e, "cache read failed, downloading archive"),
            }
        }

        let archive = within(
            deadline,
            self.inner.api.download_logs(owner, repo, run_id, attempt),
        )
        .await?;

        if let Some(cache) = &self.inner.cache {
            if let Err(e) = cache.set_file(&key, &archive, self.inner.options.archive_ttl) {
                warn!(key = %key, error = %e, "failed to cache log archive");
            }
        }

        Ok(archive)
    }

    async fn step_metadata(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
        job_name: &str,
        deadline: Instant,
    ) -> Result<BTreeMap<u64, Step>> {
        let request = self.inner.api.get_attempt_jobs(
            owner,
            repo,
            run_id,
            attempt,
            1,
            self.inner.options.step_jobs_per_page,
        );
        let (jobs, _) = within(deadline, request).await?;

        let steps: BTreeMap<u64, Step> = jobs
            .into_iter()
            .find(|job| job.name == job_name)
            .map(|job| job.steps.into_iter().map(|step| (step.number, step)).collect())
            .unwrap_or_default();

        if steps.is_empty() {
            debug!(owner, repo, run_id, job = job_name, "no step metadata for job");
        }
        Ok(steps)
    }
}
