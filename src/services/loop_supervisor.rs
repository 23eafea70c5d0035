//! Background loop supervisor.
//!
//! Owns the lifecycle of every periodic background task the runtime runs
//! (health probes, persistence flushes, reflection, memory decay, pattern
//! extraction). Its one job is to make sure a task's unhandled error is
//! always logged, never silently dropped, and that shutdown cancels every
//! task and waits for them to settle.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A supervised background task, keyed by name.
struct Supervised {
    handle: JoinHandle<anyhow::Result<()>>,
}

/// Owns a set of named background tasks and coordinates their shutdown.
///
/// Cloning shares the same task table: every clone can `spawn` onto it and
/// every clone's `shutdown` cancels all tasks spawned through any clone.
#[derive(Clone)]
pub struct LoopSupervisor {
    tasks: Arc<Mutex<HashMap<String, Supervised>>>,
    shutting_down: Arc<AtomicBool>,
}

impl LoopSupervisor {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a named background task. `fut` should run until cancelled (or
    /// loop forever); its `Result` is inspected on completion so that an
    /// error never silently disappears. Spawning over an existing name
    /// aborts the previous task first.
    pub async fn spawn<F>(&self, name: impl Into<String>, fut: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(fut);

        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.insert(name.clone(), Supervised { handle }) {
            previous.handle.abort();
        }
        info!(task = %name, "background task started");
    }

    /// Cancel every supervised task and wait for all of them to settle,
    /// logging any task that exited with an error (cancellation is not an
    /// error and is returned silently) and warning about any task that
    /// exited cleanly without a shutdown having been requested.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);

        let tasks: Vec<(String, Supervised)> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain().collect()
        };

        for (name, supervised) in tasks {
            supervised.handle.abort();
            Self::settle(&name, supervised.handle, true).await;
        }
    }

    /// Poll whether any currently supervised task has already finished,
    /// logging its outcome and removing it from the table. Intended to be
    /// called periodically by whoever owns the supervisor so a task's
    /// completion is observed even between explicit shutdowns.
    pub async fn reap_finished(&self) {
        let finished: Vec<(String, Supervised)> = {
            let mut tasks = self.tasks.lock().await;
            let finished_names: Vec<String> = tasks
                .iter()
                .filter(|(_, s)| s.handle.is_finished())
                .map(|(name, _)| name.clone())
                .collect();
            finished_names
                .into_iter()
                .filter_map(|name| tasks.remove(&name).map(|s| (name, s)))
                .collect()
        };

        let shutting_down = self.shutting_down.load(Ordering::Acquire);
        for (name, supervised) in finished {
            Self::settle(&name, supervised.handle, shutting_down).await;
        }
    }

    async fn settle(name: &str, handle: JoinHandle<anyhow::Result<()>>, shutdown_requested: bool) {
        match handle.await {
            Ok(Ok(())) => {
                if !shutdown_requested {
                    warn!(task = %name, "background task exited cleanly without a shutdown request");
                }
            }
            Ok(Err(error)) => {
                error!(task = %name, error = %error, "background task returned an error");
            }
            Err(join_error) if join_error.is_cancelled() => {}
            Err(join_error) => {
                error!(task = %name, error = %join_error, "background task panicked");
            }
        }
    }

    /// Names of currently supervised tasks, for status reporting.
    pub async fn task_names(&self) -> Vec<String> {
        self.tasks.lock().await.keys().cloned().collect()
    }
}

impl Default for LoopSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let supervisor = LoopSupervisor::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_clone = ticks.clone();

        supervisor
            .spawn("ticker", async move {
                loop {
                    ticks_clone.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        supervisor.shutdown().await;

        assert!(ticks.load(Ordering::SeqCst) > 0);
        assert!(supervisor.task_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_respawning_same_name_aborts_previous() {
        let supervisor = LoopSupervisor::new();
        supervisor
            .spawn("loop", async { std::future::pending::<anyhow::Result<()>>().await })
            .await;
        supervisor
            .spawn("loop", async { std::future::pending::<anyhow::Result<()>>().await })
            .await;

        assert_eq!(supervisor.task_names().await.len(), 1);
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_erroring_task_is_reaped_without_panicking_supervisor() {
        let supervisor = LoopSupervisor::new();
        supervisor
            .spawn("failing", async { Err(anyhow::anyhow!("deliberate failure")) })
            .await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        supervisor.reap_finished().await;

        assert!(supervisor.task_names().await.is_empty());
    }
}
