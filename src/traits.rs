//! Work-function traits for pipeline stages.
//!
//! A stage runs its work function from several workers at once, so every
//! method takes `&self`. Implementations that touch shared state must
//! synchronize it themselves.

use crate::classify::Classified;
use crate::error::Result;
use crate::metrics::{Instrumented, MetricsHandler};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Produces values for a source stage.
///
/// Return [`Error::Exhausted`](crate::Error::Exhausted) when there is nothing
/// left; the worker that sees it stops. Any other error is published on the
/// stage's error channel and the worker keeps going.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use pipeworks::{Error, Producer, Result};
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use tokio_util::sync::CancellationToken;
///
/// struct Counter {
///     next: AtomicU64,
///     max: u64,
/// }
///
/// #[async_trait]
/// impl Producer for Counter {
///     type Item = u64;
///
///     async fn produce(&self, _token: &CancellationToken) -> Result<u64> {
///         let n = self.next.fetch_add(1, Ordering::SeqCst);
///         if n < self.max {
///             Ok(n)
///         } else {
///             Err(Error::Exhausted)
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Producer: Send + Sync {
    /// The type of items this producer generates
    type Item: Send + 'static;

    /// Produce the next value.
    async fn produce(&self, token: &CancellationToken) -> Result<Self::Item>;
}

/// Maps one input value to one output value for a transform stage.
#[async_trait]
pub trait Mapper: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    async fn map(&self, item: Self::Input) -> Result<Self::Output>;
}

/// Consumes values at the end of a pipeline.
#[async_trait]
pub trait Sink: Send + Sync {
    type Item: Send + 'static;

    async fn consume(&self, item: Self::Item) -> Result<()>;
}

#[async_trait]
impl<P: Producer + ?Sized> Producer for Arc<P> {
    type Item = P::Item;

    async fn produce(&self, token: &CancellationToken) -> Result<Self::Item> {
        (**self).produce(token).await
    }
}

#[async_trait]
impl<M: Mapper + ?Sized> Mapper for Arc<M> {
    type Input = M::Input;
    type Output = M::Output;

    async fn map(&self, item: Self::Input) -> Result<Self::Output> {
        (**self).map(item).await
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    type Item = S::Item;

    async fn consume(&self, item: Self::Item) -> Result<()> {
        (**self).consume(item).await
    }
}

/// Decorator methods for producers
pub trait ProducerExt: Producer + Sized {
    /// Tag non-fatal errors with a service and stage identity
    fn classified(self, service: &str, stage: &str) -> Classified<Self> {
        Classified::new(self, service, stage)
    }

    /// Record invocation metrics through `handler`
    fn instrumented<H: MetricsHandler>(
        self,
        service: &str,
        stage: &str,
        handler: H,
    ) -> Instrumented<Self, H> {
        Instrumented::new(self, service, stage, handler)
    }
}

impl<P: Producer> ProducerExt for P {}

/// Decorator methods for mappers
pub trait MapperExt: Mapper + Sized {
    /// Tag non-fatal errors with a service and stage identity
    fn classified(self, service: &str, stage: &str) -> Classified<Self> {
        Classified::new(self, service, stage)
    }

    /// Record invocation metrics through `handler`
    fn instrumented<H: MetricsHandler>(
        self,
        service: &str,
        stage: &str,
        handler: H,
    ) -> Instrumented<Self, H> {
        Instrumented::new(self, service, stage, handler)
    }
}

impl<M: Mapper> MapperExt for M {}

/// Decorator methods for sinks
pub trait SinkExt: Sink + Sized {
    /// Tag non-fatal errors with a service and stage identity
    fn classified(self, service: &str, stage: &str) -> Classified<Self> {
        Classified::new(self, service, stage)
    }

    /// Record invocation metrics through `handler`
    fn instrumented<H: MetricsHandler>(
        self,
        service: &str,
        stage: &str,
        handler: H,
    ) -> Instrumented<Self, H> {
        Instrumented::new(self, service, stage, handler)
    }
}

impl<S: Sink> SinkExt for S {}
