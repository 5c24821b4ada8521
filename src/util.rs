//! Adapters that turn async closures into work functions.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::traits::{Mapper, Producer, Sink};

/// Helper function to create a producer from a function.
///
/// The closure receives a clone of the stage's cancellation token.
pub fn producer_fn<F, Fut, T>(f: F) -> ProducerFn<F, Fut, T>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
    T: Send + 'static,
{
    ProducerFn {
        f,
        _phantom: PhantomData,
    }
}

/// A producer created from a function
pub struct ProducerFn<F, Fut, T> {
    f: F,
    _phantom: PhantomData<fn() -> (Fut, T)>,
}

#[async_trait]
impl<F, Fut, T> Producer for ProducerFn<F, Fut, T>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn produce(&self, token: &CancellationToken) -> Result<T> {
        (self.f)(token.clone()).await
    }
}

/// Helper function to create a mapper from a function
pub fn mapper_fn<F, Fut, T, U>(f: F) -> MapperFn<F, Fut, T, U>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<U>> + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    MapperFn {
        f,
        _phantom: PhantomData,
    }
}

/// A mapper created from a function
pub struct MapperFn<F, Fut, T, U> {
    f: F,
    _phantom: PhantomData<fn(T) -> (Fut, U)>,
}

#[async_trait]
impl<F, Fut, T, U> Mapper for MapperFn<F, Fut, T, U>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<U>> + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    async fn map(&self, item: T) -> Result<U> {
        (self.f)(item).await
    }
}

/// Helper function to create a sink from a function
pub fn sink_fn<F, Fut, T>(f: F) -> SinkFn<F, Fut, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    SinkFn {
        f,
        _phantom: PhantomData,
    }
}

/// A sink created from a function
pub struct SinkFn<F, Fut, T> {
    f: F,
    _phantom: PhantomData<fn(T) -> Fut>,
}

#[async_trait]
impl<F, Fut, T> Sink for SinkFn<F, Fut, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn consume(&self, item: T) -> Result<()> {
        (self.f)(item).await
    }
}
