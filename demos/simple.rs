//! A generator feeding a filter stage and a printing sink.

use pipeworks::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Simple Pipeline Example ===");

    let token = CancellationToken::new();
    let picks = Arc::new(AtomicUsize::new(0));
    let colors = producer_fn(move |_| {
        let picks = picks.clone();
        async move {
            let n = picks.fetch_add(1, Ordering::SeqCst);
            if n >= 12 {
                return Err(Error::Exhausted);
            }
            Ok(["red", "green", "blue"][n % 3])
        }
    })
    .classified("colors", "generator");

    let not_red = mapper_fn(|c: &'static str| async move { Ok::<_, Error>((c != "red").then_some(c)) })
        .classified("colors", "filter");

    let print = sink_fn(|c: &'static str| async move {
        println!("Processed: {c}");
        Ok::<_, Error>(())
    })
    .classified("colors", "printer");

    let (generated, generated_err) = source(token.clone(), colors, StageConfig::new(1, 1));
    let (filtered, filtered_err) = filter_transform(generated, not_red, StageConfig::new(2, 2));
    let printed_err = sink(filtered, print, StageConfig::new(1, 1));

    let errors = merge([generated_err, filtered_err, printed_err]);
    if let Some(err) = ErrorWatcher::watch(errors, token, ShutdownPolicy::default()).await {
        return Err(err);
    }

    println!("Simple pipeline completed!\n");
    Ok(())
}
