//! Runtime halves of sources and sinks: owned tokio tasks with a stop
//! channel, plus the lifecycle collection a dataflow task keeps them in.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to one spawned runtime task.
///
/// The handle is the sole owner of the task: creators hand it back with the
/// driver and keep nothing. Dropping the handle drops the stop channel,
/// which asks the task to wind down on its own.
pub struct RuntimeHandle {
    label: String,
    stop_tx: watch::Sender<()>,
    join: JoinHandle<()>,
}

impl RuntimeHandle {
    /// Spawn a runtime task. The closure receives the stop receiver; the
    /// task should exit soon after the sender side goes away.
    pub fn spawn<F, Fut>(label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(watch::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        let (stop_tx, stop_rx) = watch::channel(());
        let join = tokio::spawn(f(stop_rx));
        debug!("Spawned runtime task '{}'", label);
        Self {
            label,
            stop_tx,
            join,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Hard-cancel the task.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Signal stop and wait up to `grace` for the task to exit, aborting
    /// it if it does not.
    pub async fn stop(self, grace: Duration) {
        let Self {
            label,
            stop_tx,
            mut join,
        } = self;
        drop(stop_tx);
        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(())) => debug!("Runtime task '{}' stopped", label),
            Ok(Err(e)) => warn!("Runtime task '{}' ended abnormally: {}", label, e),
            Err(_) => {
                warn!(
                    "Runtime task '{}' did not stop within {:?}, aborting",
                    label, grace
                );
                join.abort();
            }
        }
    }
}

/// Owns every runtime handle a task's sources and sinks returned.
///
/// Once a pair is built this is the only place its runtime half can be
/// reached from; shutting the task down means draining this collection.
#[derive(Default)]
pub struct Lifecycle {
    handles: Vec<RuntimeHandle>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a runtime half.
    pub fn adopt(&mut self, handle: RuntimeHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every runtime half, waiting up to `grace` for each.
    pub async fn shutdown_all(&mut self, grace: Duration) {
        for handle in self.handles.drain(..) {
            handle.stop(grace).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_signals_task() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let handle = RuntimeHandle::spawn("stoppable", |mut stop| async move {
            let _ = stop.changed().await;
            let _ = done_tx.send(());
        });
        assert_eq!(handle.label(), "stoppable");
        handle.stop(Duration::from_secs(1)).await;
        done_rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_aborts_stuck_task() {
        let handle = RuntimeHandle::spawn("stuck", |_stop| async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
        // Must return despite the task ignoring its stop channel.
        handle.stop(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_lifecycle_shutdown_all() {
        let mut lifecycle = Lifecycle::new();
        for i in 0..3 {
            lifecycle.adopt(RuntimeHandle::spawn(format!("task-{i}"), |mut stop| {
                async move {
                    let _ = stop.changed().await;
                }
            }));
        }
        assert_eq!(lifecycle.len(), 3);
        lifecycle.shutdown_all(Duration::from_secs(1)).await;
        assert!(lifecycle.is_empty());
    }
}
