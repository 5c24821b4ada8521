//! # Channel-based pipeline stages for tokio
//!
//! This crate provides the building blocks of multi-stage data pipelines:
//! a source stage that repeatedly calls a producer, transform stages that map
//! values across a pool of workers, fan-in and fan-out over channels, and a
//! sink stage that consumes the final values.
//!
//! ## Core Concepts
//!
//! - **Stage**: a pool of workers with its own output channel and error channel.
//!   The stage is the only writer of those channels and closes them once every
//!   worker has returned.
//! - **Producer / Mapper / Sink**: the work functions stages run.
//! - **Back-pressure**: every channel is bounded; a full channel blocks the
//!   workers writing to it.
//! - **Shutdown**: source stages stop on cancellation or exhaustion; every other
//!   stage stops when its input closes.
//!
//! ## Example
//!
//! ```rust
//! use pipeworks::prelude::*;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let next = Arc::new(AtomicU64::new(0));
//!     let numbers = producer_fn(move |_token| {
//!         let next = next.clone();
//!         async move {
//!             match next.fetch_add(1, Ordering::SeqCst) {
//!                 n if n < 100 => Ok(n),
//!                 _ => Err(Error::Exhausted),
//!             }
//!         }
//!     });
//!     let double = mapper_fn(|x: u64| async move { Ok::<_, Error>(x * 2) });
//!     let print = sink_fn(|x: u64| async move {
//!         println!("{x}");
//!         Ok::<_, Error>(())
//!     });
//!
//!     let token = CancellationToken::new();
//!     let (numbers, numbers_err) = source(token.clone(), numbers, StageConfig::new(10, 2));
//!     let (doubled, double_err) = transform(numbers, double, StageConfig::new(10, 4));
//!     let sink_err = sink(doubled, print, StageConfig::default());
//!
//!     let errors = merge([numbers_err, double_err, sink_err]);
//!     let first = ErrorWatcher::watch(errors, token, ShutdownPolicy::default()).await;
//!     assert!(first.is_none());
//! }
//! ```

pub mod channel;
pub mod classify;
pub mod combinators;
pub mod config;
pub mod error;
pub mod metrics;
pub mod processors;
pub mod sinks;
pub mod sources;
pub mod supervisor;
pub mod traits;
pub mod util;

mod pool;

// Re-export commonly used items
pub mod prelude {
    pub use crate::channel::{collect, collect_all, from_iter, into_stream, ErrorOutlet, Outlet};
    pub use crate::classify::Classified;
    pub use crate::combinators::{broadcast, merge};
    pub use crate::config::StageConfig;
    pub use crate::error::{Error, ErrorKind, IntoError, Result};
    pub use crate::metrics::{Instrumented, MetricsHandler, StageMetrics};
    pub use crate::processors::{filter_transform, transform, transform_drop_default};
    pub use crate::sinks::sink;
    pub use crate::sources::source;
    pub use crate::supervisor::{ErrorWatcher, ShutdownPolicy};
    pub use crate::traits::{Mapper, MapperExt, Producer, ProducerExt, Sink, SinkExt};
    pub use crate::util::{mapper_fn, producer_fn, sink_fn};
    pub use tokio_util::sync::CancellationToken;
}

pub use combinators::{broadcast, merge};
pub use config::StageConfig;
pub use error::{Error, ErrorKind, Result};
pub use processors::{filter_transform, transform, transform_drop_default};
pub use sinks::sink;
pub use sources::source;
pub use traits::{Mapper, Producer, Sink};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
