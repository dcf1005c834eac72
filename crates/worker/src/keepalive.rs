//! Keep-alive obligations for work that outlives an event's result.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};

/// Tracks background tasks the host must let finish before teardown.
///
/// Finished tasks are reaped whenever a task is spawned or counted, so a
/// long-running host only holds the tasks still in flight.
#[derive(Debug, Clone, Default)]
pub struct KeepAlive {
    pending: Arc<Mutex<JoinSet<()>>>,
}

fn report(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "keep-alive task did not complete");
    }
}

fn reap(set: &mut JoinSet<()>) {
    while let Some(result) = set.try_join_next() {
        report(result);
    }
}

impl KeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task and register it as an obligation.
    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.pending.lock().await;
        reap(&mut set);
        set.spawn(task);
    }

    /// Number of obligations still running.
    pub async fn pending(&self) -> usize {
        let mut set = self.pending.lock().await;
        reap(&mut set);
        set.len()
    }

    /// Await every outstanding obligation, including ones registered meanwhile.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.pending.lock().await);
            if batch.is_empty() {
                break;
            }
            while let Some(result) = batch.join_next().await {
                report(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_all() {
        let keep_alive = KeepAlive::new();
        let done = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Semaphore::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            let gate = Arc::clone(&gate);
            keep_alive
                .spawn(async move {
                    let _permit = gate.acquire().await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        assert_eq!(keep_alive.pending().await, 3);
        gate.add_permits(3);
        keep_alive.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(keep_alive.pending().await, 0);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_reaped_without_settle() {
        let keep_alive = KeepAlive::new();
        for _ in 0..200 {
            keep_alive.spawn(async {}).await;
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while keep_alive.pending().await > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("finished tasks should be reaped");
        assert_eq!(keep_alive.pending().await, 0);
    }

    #[tokio::test]
    async fn test_settle_survives_panicking_task() {
        let keep_alive = KeepAlive::new();
        keep_alive.spawn(async { panic!("refresh blew up") }).await;
        keep_alive.settle().await;
        assert_eq!(keep_alive.pending().await, 0);
    }
}
