// Fetched object graph.
// Repository → workflow → run → job nodes, with per-branch errors and list-row projections.

use serde::Serialize;

use crate::github::{Job, Repository, Workflow, WorkflowRun};

/// A repository with its workflows.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryNode {
    pub repository: Repository,
    pub workflows: Vec<WorkflowNode>,
    /// Set when the workflow list itself could not be loaded.
    pub error: Option<String>,
}

/// A workflow with its most recent runs, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowNode {
    pub workflow: Workflow,
    pub runs: Vec<RunNode>,
    /// Set when the run list could not be loaded.
    pub error: Option<String>,
}

/// A run with its jobs. A failed job fetch leaves `jobs` empty.
#[derive(Debug, Clone, Serialize)]
pub struct RunNode {
    pub run: WorkflowRun,
    pub jobs: Vec<Job>,
}

/// What every selectable row in the dashboard exposes.
pub trait RowData {
    fn id(&self) -> String;
    fn name(&self) -> &str;
    fn url(&self) -> &str;
}

impl RowData for RepositoryNode {
    fn id(&self) -> String {
        self.repository.id.to_string()
    }

    fn name(&self) -> &str {
        &self.repository.full_name
    }

    fn url(&self) -> &str {
        &self.repository.html_url
    }
}

impl RowData for RunNode {
    fn id(&self) -> String {
        self.run.id.to_string()
    }

    fn name(&self) -> &str {
        &self.run.display_title
    }

    fn url(&self) -> &str {
        &self.run.html_url
    }
}

impl RowData for Job {
    fn id(&self) -> String {
        self.id.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.html_url
    }
}

/// A row of one of the three list views.
#[derive(Debug, Clone, Copy)]
pub enum Row<'a> {
    Repository(&'a RepositoryNode),
    Run(&'a RunNode),
    Job(&'a Job),
}

impl Row<'_> {
    fn data(&self) -> &dyn RowData {
        match self {
            Row::Repository(node) => *node,
            Row::Run(node) => *node,
            Row::Job(job) => *job,
        }
    }
}

impl RowData for Row<'_> {
    fn id(&self) -> String {
        self.data().id()
    }

    fn name(&self) -> &str {
        self.data().name()
    }

    fn url(&self) -> &str {
        self.data().url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{RunConclusion, RunStatus};
    use chrono::Utc;

    fn run() -> RunNode {
        RunNode {
            run: WorkflowRun {
                id: 7,
                name: Some("CI".to_string()),
                display_title: "Fix flaky test".to_string(),
                run_number: 12,
                run_attempt: Some(1),
                status: RunStatus::Completed,
                conclusion: Some(RunConclusion::Success),
                workflow_id: 3,
                event: "push".to_string(),
                head_branch: Some("main".to_string()),
                head_sha: "abc123".to_string(),
                head_commit: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                html_url: "https://github.com/o/r/actions/runs/7".to_string(),
            },
            jobs: vec![Job {
                id: 70,
                run_id: 7,
                run_attempt: Some(1),
                name: "build".to_string(),
                status: RunStatus::Completed,
                conclusion: Some(RunConclusion::Success),
                started_at: None,
                completed_at: None,
                html_url: "https://github.com/o/r/actions/runs/7/job/70".to_string(),
                steps: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_row_dispatch() {
        let node = run();

        let row = Row::Run(&node);
        assert_eq!(row.id(), "7");
        assert_eq!(row.name(), "Fix flaky test");
        assert!(row.url().ends_with("/runs/7"));

        let row = Row::Job(&node.jobs[0]);
        assert_eq!(row.id(), "70");
        assert_eq!(row.name(), "build");
        assert!(row.url().ends_with("/job/70"));
    }
}
