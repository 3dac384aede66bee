// Actions API abstraction.
// The subset of GitHub endpoints the fetch orchestrator depends on, as a mockable trait.

use async_trait::async_trait;

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{Job, Repository, Workflow, WorkflowRun};

/// Remote calls needed to assemble the repository/workflow/run/job graph and logs.
#[async_trait]
pub trait ActionsApi: Send + Sync + 'static {
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository>;

    async fn get_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Workflow>, u64)>;

    async fn get_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<WorkflowRun>, u64)>;

    async fn get_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Job>, u64)>;

    async fn get_attempt_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Job>, u64)>;

    /// Raw zip archive of every job's logs for one run attempt.
    async fn download_logs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
    ) -> Result<Vec<u8>>;
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        GitHubClient::get_repo(self, owner, repo).await
    }

    async fn get_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Workflow>, u64)> {
        GitHubClient::get_workflows(self, owner, repo, page, per_page).await
    }

    async fn get_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<WorkflowRun>, u64)> {
        self.get_workflow_runs_for_workflow(owner, repo, workflow_id, page, per_page)
            .await
    }

    async fn get_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Job>, u64)> {
        GitHubClient::get_jobs(self, owner, repo, run_id, page, per_page).await
    }

    async fn get_attempt_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Job>, u64)> {
        self.get_jobs_for_attempt(owner, repo, run_id, attempt, page, per_page)
            .await
    }

    async fn download_logs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
    ) -> Result<Vec<u8>> {
        self.get_run_attempt_logs(owner, repo, run_id, attempt).await
    }
}
