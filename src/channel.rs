//! Channel lifecycle helpers.
//!
//! Every stage owns its output channels: its workers are the only writers and
//! the stage closes the channels by dropping its senders once all workers have
//! joined. Readers never close anything; they drain until `recv` yields `None`.

use futures_core::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Error;

/// Receiving half handed out by every stage
pub type Outlet<T> = mpsc::Receiver<T>;

/// Error channel of a stage
pub type ErrorOutlet = mpsc::Receiver<Error>;

/// A receiver that several workers pull from.
///
/// The lock is held only while waiting for the next item, never while the
/// item is processed.
pub(crate) struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> SharedReceiver<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Next item, or `None` once the channel is closed and drained
    pub(crate) async fn next(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Create a closed channel pre-populated with `items` in order.
///
/// Useful for feeding a fixed batch of work into a transform or sink stage.
pub fn from_iter<I>(items: I) -> Outlet<I::Item>
where
    I: IntoIterator,
{
    let items: Vec<I::Item> = items.into_iter().collect();
    let (tx, rx) = mpsc::channel(items.len().max(1));
    for item in items {
        // capacity covers every item and `rx` is alive, so this cannot fail
        if tx.try_send(item).is_err() {
            break;
        }
    }
    rx
}

/// View a stage outlet as a `Stream`
pub fn into_stream<T>(outlet: Outlet<T>) -> impl Stream<Item = T> {
    ReceiverStream::new(outlet)
}

/// Drain an outlet into a vector, returning once it closes
pub async fn collect<T>(mut outlet: Outlet<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Some(item) = outlet.recv().await {
        items.push(item);
    }
    items
}

/// Drain a value/error pair concurrently so neither side can stall the stage
pub async fn collect_all<T>(values: Outlet<T>, errors: ErrorOutlet) -> (Vec<T>, Vec<Error>) {
    tokio::join!(collect(values), collect(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_from_iter_is_closed_and_ordered() {
        let rx = from_iter(vec!["a", "b", "c"]);
        assert_eq!(collect(rx).await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_from_empty_iter() {
        let mut rx = from_iter(Vec::<i32>::new());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let stream = into_stream(from_iter(1..=3));
        let items: Vec<i32> = stream.collect().await;
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_shared_receiver_splits_items() {
        let shared = SharedReceiver::new(from_iter(0..10));
        let other = shared.clone();

        let (a, b) = tokio::join!(
            async {
                let mut seen = Vec::new();
                while let Some(v) = shared.next().await {
                    seen.push(v);
                }
                seen
            },
            async {
                let mut seen = Vec::new();
                while let Some(v) = other.next().await {
                    seen.push(v);
                }
                seen
            }
        );

        let mut all: Vec<_> = a.into_iter().chain(b).collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }
}
