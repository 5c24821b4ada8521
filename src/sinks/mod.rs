//! The sink stage: terminal consumers that only report errors.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::channel::{ErrorOutlet, Outlet, SharedReceiver};
use crate::config::StageConfig;
use crate::pool::WorkerSet;
use crate::traits::Sink;

const STAGE: &str = "sink";

/// Start a sink stage that feeds every item of `input` to `sink`.
///
/// Errors returned by the sink are published on the returned channel, which
/// closes once `input` is drained and every worker has returned.
/// `config.buffer_size` sizes the error channel.
pub fn sink<S>(input: Outlet<S::Item>, sink: S, config: StageConfig) -> ErrorOutlet
where
    S: Sink + 'static,
{
    let (etx, erx) = mpsc::channel(config.channel_capacity());
    let input = SharedReceiver::new(input);
    let sink = Arc::new(sink);

    let mut workers = WorkerSet::new(STAGE);
    workers.spawn_n(config.worker_count(), |worker| {
        let input = input.clone();
        let sink = sink.clone();
        let etx = etx.clone();
        async move {
            while let Some(item) = input.next().await {
                if let Err(e) = sink.consume(item).await {
                    if let Err(unsent) = etx.send(e).await {
                        warn!(stage = STAGE, worker, error = %unsent.0, "error receiver dropped");
                    }
                }
            }
            debug!(stage = STAGE, worker, "input drained");
        }
    });
    workers.close_when_done(Some(etx), ());

    erx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{collect, from_iter};
    use crate::error::Error;
    use crate::util::sink_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_failing_sink_reports_every_item() {
        let successes = Arc::new(AtomicUsize::new(0));
        let failing = {
            let successes = successes.clone();
            sink_fn(move |x: i32| {
                let successes = successes.clone();
                async move {
                    if x > 0 {
                        return Err(Error::custom(format!("rejected {x}")));
                    }
                    successes.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };

        let errors = collect(sink(from_iter(1..=5), failing, StageConfig::new(5, 3))).await;
        assert_eq!(errors.len(), 5);
        assert_eq!(successes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_passing_sink_sees_every_item() {
        let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let recorder = {
            let seen = seen.clone();
            sink_fn(move |x: i32| {
                let seen = seen.clone();
                async move {
                    seen.lock().await.push(x);
                    Ok::<(), Error>(())
                }
            })
        };

        let errors = collect(sink(from_iter(1..=5), recorder, StageConfig::new(1, 3))).await;
        assert!(errors.is_empty());

        let mut seen = seen.lock().await.clone();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_closed_empty_input() {
        let noop = sink_fn(|_: i32| async { Ok::<(), Error>(()) });
        let mut errors = sink(from_iter(Vec::new()), noop, StageConfig::default());
        assert!(errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_error_receiver_keeps_consuming() {
        let seen = Arc::new(AtomicUsize::new(0));
        let picky = {
            let seen = seen.clone();
            sink_fn(move |x: i32| {
                let seen = seen.clone();
                async move {
                    if x % 2 == 0 {
                        return Err(Error::custom(format!("even {x}")));
                    }
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };

        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(sink(rx, picky, StageConfig::new(1, 1)));
        for x in 1..=10 {
            tx.send(x).await.unwrap();
        }
        drop(tx);
        // a send only completes once the worker took the previous item
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }
}
