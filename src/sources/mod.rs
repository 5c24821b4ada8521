//! The source stage: repeatedly calls a producer from a pool of workers.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::{ErrorOutlet, Outlet};
use crate::config::StageConfig;
use crate::pool::WorkerSet;
use crate::traits::Producer;

const STAGE: &str = "source";

/// Start a source stage.
///
/// Each of `config.workers` workers loops: if `token` is cancelled it stops,
/// otherwise it calls `producer` and publishes the value or the error.
/// [`Error::Exhausted`](crate::error::Error::Exhausted), bare or wrapped,
/// stops only the worker that received it; the other
/// workers keep calling the producer until they see it themselves. Both
/// returned channels close once every worker has stopped.
///
/// Without cancellation or exhaustion the stage runs forever.
pub fn source<P>(
    token: CancellationToken,
    producer: P,
    config: StageConfig,
) -> (Outlet<P::Item>, ErrorOutlet)
where
    P: Producer + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity());
    let (etx, erx) = mpsc::channel(config.channel_capacity());
    let producer = Arc::new(producer);

    let mut workers = WorkerSet::new(STAGE);
    workers.spawn_n(config.worker_count(), |worker| {
        let producer = producer.clone();
        let token = token.clone();
        let tx = tx.clone();
        let etx = etx.clone();
        async move {
            loop {
                if token.is_cancelled() {
                    debug!(stage = STAGE, worker, "cancelled");
                    break;
                }
                match producer.produce(&token).await {
                    Ok(item) => {
                        if tx.send(item).await.is_err() {
                            debug!(stage = STAGE, worker, "value receiver dropped");
                            break;
                        }
                    }
                    Err(e) if e.is_exhausted() => {
                        debug!(stage = STAGE, worker, "producer exhausted");
                        break;
                    }
                    Err(e) => {
                        if let Err(unsent) = etx.send(e).await {
                            warn!(stage = STAGE, worker, error = %unsent.0, "error receiver dropped");
                        }
                    }
                }
            }
        }
    });
    workers.close_when_done(Some(etx), tx);

    (rx, erx)
}
