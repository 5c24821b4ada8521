//! A service pipeline: fetch, decode, tag, publish.
//!
//! Every stage is classified and instrumented. A fatal error from the
//! publisher cancels the fetcher, and the rest of the pipeline drains.

use pipeworks::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SERVICE: &str = "example-service";

#[derive(Debug, thiserror::Error)]
#[error("publisher rejected record {0}")]
struct PublisherGone(u32);

#[derive(Debug, Clone)]
struct Tagged {
    id: u32,
    tags: Vec<&'static str>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let metrics = Arc::new(StageMetrics::new());
    let token = CancellationToken::new();

    let next_id = Arc::new(AtomicU32::new(0));
    let fetch = producer_fn(move |_| {
        let next_id = next_id.clone();
        async move {
            let id = next_id.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(format!("record-{id}").into_bytes())
        }
    })
    .classified(SERVICE, "fetch")
    .instrumented(SERVICE, "fetch", metrics.clone());

    let decode = mapper_fn(|raw: Vec<u8>| async move {
        let text = String::from_utf8(raw).map_err(Error::other)?;
        text.trim_start_matches("record-")
            .parse::<u32>()
            .map_err(Error::other)
    })
    .classified(SERVICE, "decode")
    .instrumented(SERVICE, "decode", metrics.clone());

    let tag = mapper_fn(|id: u32| async move {
        if id % 7 == 3 {
            return Err(Error::custom(format!("cannot tag {id}")));
        }
        let tags = if id % 2 == 0 { vec!["even"] } else { vec!["odd"] };
        Ok(Tagged { id, tags })
    })
    .classified(SERVICE, "tag")
    .instrumented(SERVICE, "tag", metrics.clone());

    let publish = sink_fn(|record: Tagged| async move {
        if record.id >= 50 {
            return Err(Error::fatal(PublisherGone(record.id)));
        }
        tracing::info!(id = record.id, tags = ?record.tags, "published");
        Ok(())
    })
    .classified(SERVICE, "publish")
    .instrumented(SERVICE, "publish", metrics.clone());

    let (fetched, fetch_err) = source(token.clone(), fetch, StageConfig::new(1, 1));
    let (decoded, decode_err) = transform(fetched, decode, StageConfig::new(1, 1));
    let (tagged, tag_err) = transform(decoded, tag, StageConfig::new(4, 2));
    let publish_err = sink(tagged, publish, StageConfig::new(1, 1));

    let errors = merge([fetch_err, decode_err, tag_err, publish_err]);
    let watcher = ErrorWatcher::spawn(errors, token, ShutdownPolicy::default());

    match watcher.await {
        Ok(Some(err)) => println!("pipeline stopped: {err}"),
        Ok(None) => println!("pipeline finished"),
        Err(e) => println!("watcher failed: {e}"),
    }

    for stage in ["fetch", "decode", "tag", "publish"] {
        if let Some(stats) = metrics.stats(SERVICE, stage) {
            println!(
                "{stage:>8}: {} records, {} errors, {:?} total",
                stats.records, stats.errors, stats.total_time
            );
        }
    }
}
