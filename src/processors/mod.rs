//! Transform stages: map an input channel through a pool of workers.
//!
//! Workers compete for input items, so results come out in no particular
//! order. Every input item produces exactly one value or exactly one error,
//! except in the filtering variants, which may produce neither.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::channel::{ErrorOutlet, Outlet, SharedReceiver};
use crate::config::StageConfig;
use crate::pool::WorkerSet;
use crate::traits::Mapper;

/// Start a transform stage over `input`.
///
/// Failed items are reported on the error channel and dropped, never retried.
/// Both returned channels close after `input` is closed and drained and every
/// worker has returned.
pub fn transform<M>(
    input: Outlet<M::Input>,
    mapper: M,
    config: StageConfig,
) -> (Outlet<M::Output>, ErrorOutlet)
where
    M: Mapper + 'static,
{
    run_pool("transform", input, mapper, config, Some)
}

/// Like [`transform`], but a mapper result of `None` is dropped silently.
///
/// This is the way to write filter stages: return `Ok(None)` for items that
/// should not continue down the pipeline.
pub fn filter_transform<M, U>(
    input: Outlet<M::Input>,
    mapper: M,
    config: StageConfig,
) -> (Outlet<U>, ErrorOutlet)
where
    M: Mapper<Output = Option<U>> + 'static,
    U: Send + 'static,
{
    run_pool("filter_transform", input, mapper, config, |out| out)
}

/// Like [`transform`], but results equal to `Default::default()` are dropped.
pub fn transform_drop_default<M>(
    input: Outlet<M::Input>,
    mapper: M,
    config: StageConfig,
) -> (Outlet<M::Output>, ErrorOutlet)
where
    M: Mapper + 'static,
    M::Output: Default + PartialEq,
{
    run_pool("transform_drop_default", input, mapper, config, |out| {
        (out != M::Output::default()).then_some(out)
    })
}

fn run_pool<M, U, K>(
    stage: &'static str,
    input: Outlet<M::Input>,
    mapper: M,
    config: StageConfig,
    keep: K,
) -> (Outlet<U>, ErrorOutlet)
where
    M: Mapper + 'static,
    U: Send + 'static,
    K: Fn(M::Output) -> Option<U> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity());
    let (etx, erx) = mpsc::channel(config.channel_capacity());
    let input = SharedReceiver::new(input);
    let mapper = Arc::new(mapper);
    let keep = Arc::new(keep);

    let mut workers = WorkerSet::new(stage);
    workers.spawn_n(config.worker_count(), |worker| {
        let input = input.clone();
        let mapper = mapper.clone();
        let keep = keep.clone();
        let tx = tx.clone();
        let etx = etx.clone();
        async move {
            while let Some(item) = input.next().await {
                match mapper.map(item).await {
                    Ok(out) => {
                        let Some(out) = (*keep)(out) else {
                            continue;
                        };
                        if tx.send(out).await.is_err() {
                            debug!(stage, worker, "value receiver dropped");
                            return;
                        }
                    }
                    Err(e) => {
                        if let Err(unsent) = etx.send(e).await {
                            warn!(stage, worker, error = %unsent.0, "error receiver dropped");
                        }
                    }
                }
            }
            debug!(stage, worker, "input drained");
        }
    });
    workers.close_when_done(Some(etx), tx);

    (rx, erx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{collect, collect_all, from_iter};
    use crate::error::Error;
    use crate::util::mapper_fn;

    #[tokio::test]
    async fn test_transform_maps_every_item() {
        let double = mapper_fn(|x: i32| async move { Ok::<_, Error>(x * 2) });
        let (values, errors) = transform(from_iter(1..=5), double, StageConfig::new(5, 3));
        let (mut values, errors) = collect_all(values, errors).await;
        values.sort();
        assert_eq!(values, vec![2, 4, 6, 8, 10]);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_transform_errors_replace_values() {
        let odd_fails = mapper_fn(|x: i32| async move {
            if x % 2 == 1 {
                Err(Error::custom(format!("odd {x}")))
            } else {
                Ok(x)
            }
        });
        let (values, errors) = transform(from_iter(1..=10), odd_fails, StageConfig::new(2, 4));
        let (mut values, errors) = collect_all(values, errors).await;
        values.sort();
        assert_eq!(values, vec![2, 4, 6, 8, 10]);
        assert_eq!(errors.len(), 5);
    }

    #[tokio::test]
    async fn test_filter_transform_drops_none() {
        let evens = mapper_fn(|x: i32| async move {
            if x == 7 {
                return Err(Error::custom("seven"));
            }
            Ok((x % 2 == 0).then_some(x))
        });
        let (values, errors) =
            filter_transform(from_iter(1..=10), evens, StageConfig::new(2, 2));
        let (mut values, errors) = collect_all(values, errors).await;
        values.sort();
        assert_eq!(values, vec![2, 4, 6, 8, 10]);
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn test_drop_default_skips_empty_strings() {
        let not_red = mapper_fn(|color: &'static str| async move {
            Ok::<_, Error>(if color == "red" { String::new() } else { color.to_string() })
        });
        let input = from_iter(vec!["red", "green", "blue", "red"]);
        let (values, errors) = transform_drop_default(input, not_red, StageConfig::new(1, 2));
        let (mut values, errors) = collect_all(values, errors).await;
        values.sort();
        assert_eq!(values, vec!["blue".to_string(), "green".to_string()]);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_closed_empty_input_closes_immediately() {
        let identity = mapper_fn(|x: u8| async move { Ok::<_, Error>(x) });
        let (mut values, mut errors) =
            transform(from_iter(Vec::new()), identity, StageConfig::new(0, 0));
        assert_eq!(values.recv().await, None);
        assert!(errors.recv().await.is_none());

        let keep_all = mapper_fn(|x: u8| async move { Ok::<_, Error>(Some(x)) });
        let (mut values, mut errors) =
            filter_transform(from_iter(Vec::new()), keep_all, StageConfig::new(0, 3));
        assert_eq!(values.recv().await, None);
        assert!(errors.recv().await.is_none());

        let identity = mapper_fn(|x: u8| async move { Ok::<_, Error>(x) });
        let (mut values, mut errors) =
            transform_drop_default(from_iter(Vec::new()), identity, StageConfig::new(2, 3));
        assert_eq!(values.recv().await, None);
        assert!(errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_error_receiver_keeps_values_flowing() {
        let first_fails = mapper_fn(|x: i32| async move {
            if x == 1 {
                Err(Error::custom("first"))
            } else {
                Ok(x)
            }
        });
        let (values, errors) = transform(from_iter(1..=10), first_fails, StageConfig::new(10, 1));
        drop(errors);
        assert_eq!(collect(values).await, (2..=10).collect::<Vec<_>>());
    }
}
