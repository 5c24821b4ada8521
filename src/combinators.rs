//! Fan-in and fan-out over stage channels.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::channel::Outlet;
use crate::pool::WorkerSet;

/// Merge several channels into one.
///
/// One forwarding task per input copies every value to the shared output.
/// The output closes only after every input has closed and been drained.
/// Order within one input is kept; order across inputs is not defined.
pub fn merge<T, I>(inputs: I) -> Outlet<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = Outlet<T>>,
{
    let inputs: Vec<Outlet<T>> = inputs.into_iter().collect();
    let (tx, rx) = mpsc::channel(inputs.len().max(1));

    let mut inputs = inputs.into_iter().map(Some).collect::<Vec<_>>();
    let mut forwarders = WorkerSet::new("merge");
    forwarders.spawn_n(inputs.len(), |source| {
        let input = inputs[source].take();
        let tx = tx.clone();
        async move {
            let Some(mut input) = input else {
                return;
            };
            while let Some(item) = input.recv().await {
                if tx.send(item).await.is_err() {
                    debug!(stage = "merge", source, "output receiver dropped");
                    return;
                }
            }
        }
    });
    // merge has no error channel of its own; a panicking forwarder is only logged
    forwarders.close_when_done(None, tx);

    rx
}

/// Copy every value of `input` to every subscriber, in subscriber order,
/// before reading the next value.
///
/// A full subscriber blocks the whole broadcast, so the slowest subscriber
/// sets the pace. Subscribers whose receiver has been dropped are skipped from
/// then on. Returns the number of values read once `input` is closed and
/// drained. Subscriber channels are left open; they belong to the caller.
pub async fn broadcast<T>(mut input: Outlet<T>, subscribers: &[mpsc::Sender<T>]) -> usize
where
    T: Clone + Send + 'static,
{
    let mut live = vec![true; subscribers.len()];
    let mut count = 0;

    while let Some(item) = input.recv().await {
        count += 1;
        for (index, subscriber) in subscribers.iter().enumerate() {
            if !live[index] {
                continue;
            }
            if subscriber.send(item.clone()).await.is_err() {
                warn!(subscriber = index, "broadcast subscriber dropped");
                live[index] = false;
            }
        }
    }

    count
}
