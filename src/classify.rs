//! Error classification decorator.
//!
//! [`Classified`] tags every non-fatal error of the wrapped work function with
//! a `(service, stage)` identity so that an error consumer downstream of
//! [`merge`](crate::merge) can tell where it came from.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind, Result};
use crate::traits::{Mapper, Producer, Sink};

/// A producer, mapper or sink whose errors carry a stage identity.
///
/// Fatal errors, the exhaustion signal, and errors that are already tagged
/// pass through unchanged.
#[derive(Debug, Clone)]
pub struct Classified<F> {
    inner: F,
    service: Arc<str>,
    stage: Arc<str>,
}

impl<F> Classified<F> {
    pub fn new(inner: F, service: &str, stage: &str) -> Self {
        Self {
            inner,
            service: Arc::from(service),
            stage: Arc::from(stage),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    fn classify(&self, error: Error) -> Error {
        if error.kind() != ErrorKind::Recoverable || error.identity().is_some() {
            return error;
        }
        Error::Stage {
            service: self.service.clone(),
            stage: self.stage.clone(),
            source: Arc::new(error),
        }
    }
}

#[async_trait]
impl<P: Producer> Producer for Classified<P> {
    type Item = P::Item;

    async fn produce(&self, token: &CancellationToken) -> Result<Self::Item> {
        self.inner.produce(token).await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl<M: Mapper> Mapper for Classified<M> {
    type Input = M::Input;
    type Output = M::Output;

    async fn map(&self, item: Self::Input) -> Result<Self::Output> {
        self.inner.map(item).await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl<S: Sink> Sink for Classified<S> {
    type Item = S::Item;

    async fn consume(&self, item: Self::Item) -> Result<()> {
        self.inner.consume(item).await.map_err(|e| self.classify(e))
    }
}
