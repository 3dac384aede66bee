// GitHub API endpoint functions.
// Provides typed methods for the Actions endpoints the dashboard reads.

use serde::Deserialize;

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{Job, Repository, Workflow, WorkflowRun};

/// Response wrapper for workflows list.
#[derive(Debug, Deserialize)]
struct WorkflowsResponse {
    total_count: u64,
    workflows: Vec<Workflow>,
}

/// Response wrapper for workflow runs list.
#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    total_count: u64,
    workflow_runs: Vec<WorkflowRun>,
}

/// Response wrapper for jobs list.
#[derive(Debug, Deserialize)]
struct JobsResponse {
    total_count: u64,
    jobs: Vec<Job>,
}

fn page_params(page: u32, per_page: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("per_page", per_page.to_string())]
}

impl GitHubClient {
    /// Get a specific repository.
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        let response = self.get(&format!("/repos/{}/{}", owner, repo)).await?;
        let repository: Repository = response.json().await?;
        Ok(repository)
    }

    /// Get workflows for a repository.
    pub async fn get_workflows(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Workflow>, u64)> {
        let response = self
            .get_with_params(
                &format!("/repos/{}/{}/actions/workflows", owner, repo),
                &page_params(page, per_page),
            )
            .await?;
        let wrapper: WorkflowsResponse = response.json().await?;
        Ok((wrapper.workflows, wrapper.total_count))
    }

    /// Get workflow runs for a specific workflow, newest first.
    pub async fn get_workflow_runs_for_workflow(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<WorkflowRun>, u64)> {
        let response = self
            .get_with_params(
                &format!(
                    "/repos/{}/{}/actions/workflows/{}/runs",
                    owner, repo, workflow_id
                ),
                &page_params(page, per_page),
            )
            .await?;
        let wrapper: WorkflowRunsResponse = response.json().await?;
        Ok((wrapper.workflow_runs, wrapper.total_count))
    }

    /// Get jobs for the latest attempt of a workflow run.
    pub async fn get_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Job>, u64)> {
        let response = self
            .get_with_params(
                &format!("/repos/{}/{}/actions/runs/{}/jobs", owner, repo, run_id),
                &page_params(page, per_page),
            )
            .await?;
        let wrapper: JobsResponse = response.json().await?;
        Ok((wrapper.jobs, wrapper.total_count))
    }

    /// Get jobs for a specific attempt of a workflow run.
    pub async fn get_jobs_for_attempt(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Job>, u64)> {
        let response = self
            .get_with_params(
                &format!(
                    "/repos/{}/{}/actions/runs/{}/attempts/{}/jobs",
                    owner, repo, run_id, attempt
                ),
                &page_params(page, per_page),
            )
            .await?;
        let wrapper: JobsResponse = response.json().await?;
        Ok((wrapper.jobs, wrapper.total_count))
    }

    /// Download the zip archive of raw logs for a run attempt.
    pub async fn get_run_attempt_logs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        attempt: u64,
    ) -> Result<Vec<u8>> {
        let response = self
            .get(&format!(
                "/repos/{}/{}/actions/runs/{}/attempts/{}/logs",
                owner, repo, run_id, attempt
            ))
            .await?;
        let archive = response.bytes().await?;
        Ok(archive.to_vec())
    }
}
