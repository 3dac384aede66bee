// Fetch module.
// Concurrent, cache-aware assembly of the Actions object graph and job logs.

pub mod graph;
pub mod orchestrator;
pub mod pool;

pub use graph::{RepositoryNode, Row, RowData, RunNode, WorkflowNode};
pub use orchestrator::Fetcher;
pub use pool::{WorkerPool, parallel_map};
