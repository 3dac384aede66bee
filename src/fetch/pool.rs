// Bounded parallel map.
// Runs one task per item, gated by a fixed-capacity semaphore, and returns results in input order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// A fixed-capacity gate shared by every task of one fan-out level.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool; a capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Spawn `worker` for every item and wait for all of them.
    ///
    /// Each task holds a slot only while its worker runs. Output order matches
    /// input order regardless of completion order. Dropping the returned future
    /// aborts the tasks still running.
    pub async fn map<T, R, F, Fut>(&self, items: Vec<T>, worker: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let worker = Arc::new(worker);
        let mut join_set = JoinSet::new();
        let len = items.len();

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let worker = Arc::clone(&worker);

            join_set.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                (index, worker(item).await)
            });
        }

        let mut slots: Vec<Option<R>> = (0..len).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => warn!(error = %e, "worker task cancelled"),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// One-shot bounded parallel map with its own pool.
pub async fn parallel_map<T, R, F, Fut>(items: Vec<T>, concurrency: usize, worker: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    WorkerPool::new(concurrency).map(items, worker).await
}
