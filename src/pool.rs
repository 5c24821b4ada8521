//! Fixed-size worker groups with join-then-close semantics.

use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};

use crate::error::Error;

/// The workers of one stage instance.
///
/// Workers hold clones of the stage's senders. The original senders are moved
/// into [`WorkerSet::close_when_done`], which drops them only after every
/// worker has returned, so no channel is closed while a writer is alive.
pub(crate) struct WorkerSet {
    stage: &'static str,
    tasks: JoinSet<()>,
}

impl WorkerSet {
    pub(crate) fn new(stage: &'static str) -> Self {
        Self {
            stage,
            tasks: JoinSet::new(),
        }
    }

    /// Spawn `count` workers built by `make_worker(worker_id)`
    pub(crate) fn spawn_n<F, Fut>(&mut self, count: usize, mut make_worker: F)
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        for id in 0..count {
            self.tasks.spawn(make_worker(id));
        }
        debug!(stage = self.stage, workers = count, "stage started");
    }

    /// Join every worker, then drop `errors` and `outlets` to close the
    /// stage's channels. A panicking worker is reported on `errors` first.
    pub(crate) fn close_when_done<O>(self, errors: Option<mpsc::Sender<Error>>, outlets: O)
    where
        O: Send + 'static,
    {
        let WorkerSet { stage, mut tasks } = self;
        tokio::spawn(async move {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    report_join_error(stage, errors.as_ref(), e).await;
                }
            }
            drop(outlets);
            drop(errors);
            debug!(stage, "all workers finished, channels closed");
        });
    }
}

async fn report_join_error(stage: &'static str, errors: Option<&mpsc::Sender<Error>>, e: JoinError) {
    if !e.is_panic() {
        return;
    }
    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    error!(stage, %message, "worker panicked");
    if let Some(errors) = errors {
        let _ = errors.send(Error::WorkerPanicked { stage, message }).await;
    }
}
