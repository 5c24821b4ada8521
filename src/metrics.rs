//! Invocation metrics for work functions.
//!
//! [`Instrumented`] wraps a producer, mapper or sink and reports every call to
//! a [`MetricsHandler`]: the call is counted, timed, and marked as a success
//! or failure. Handlers decide where the numbers go. [`StageMetrics`] keeps
//! them in memory; with the `metrics` feature, [`MetricsFacade`] forwards them
//! to whatever recorder is installed for the `metrics` crate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::traits::{Mapper, Producer, Sink};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";
pub const STATUS_EXHAUSTED: &str = "exhausted";

/// Receives metric events from instrumented work functions.
pub trait MetricsHandler: Send + Sync {
    fn record_last_successful_execution(&self, service: &str, stage: &str);
    fn record_execution_time(&self, elapsed: Duration, service: &str, stage: &str, status: &str);
    fn increment_record_count(&self, service: &str, stage: &str);
    fn increment_error_count(&self, service: &str, stage: &str);
}

impl<H: MetricsHandler + ?Sized> MetricsHandler for Arc<H> {
    fn record_last_successful_execution(&self, service: &str, stage: &str) {
        (**self).record_last_successful_execution(service, stage)
    }

    fn record_execution_time(&self, elapsed: Duration, service: &str, stage: &str, status: &str) {
        (**self).record_execution_time(elapsed, service, stage, status)
    }

    fn increment_record_count(&self, service: &str, stage: &str) {
        (**self).increment_record_count(service, stage)
    }

    fn increment_error_count(&self, service: &str, stage: &str) {
        (**self).increment_error_count(service, stage)
    }
}

/// A work function that reports its invocations to a [`MetricsHandler`]
#[derive(Debug, Clone)]
pub struct Instrumented<F, H> {
    inner: F,
    handler: H,
    service: Arc<str>,
    stage: Arc<str>,
}

impl<F, H: MetricsHandler> Instrumented<F, H> {
    pub fn new(inner: F, service: &str, stage: &str, handler: H) -> Self {
        Self {
            inner,
            handler,
            service: Arc::from(service),
            stage: Arc::from(stage),
        }
    }

    fn started(&self) -> Instant {
        self.handler.increment_record_count(&self.service, &self.stage);
        Instant::now()
    }

    fn finished<T>(&self, started: Instant, result: &Result<T>) {
        let elapsed = started.elapsed();
        let (service, stage) = (&*self.service, &*self.stage);
        match result {
            Ok(_) => {
                self.handler.record_last_successful_execution(service, stage);
                self.handler
                    .record_execution_time(elapsed, service, stage, STATUS_SUCCESS);
            }
            Err(e) if e.is_exhausted() => {
                self.handler
                    .record_execution_time(elapsed, service, stage, STATUS_EXHAUSTED);
            }
            Err(_) => {
                self.handler.increment_error_count(service, stage);
                self.handler
                    .record_execution_time(elapsed, service, stage, STATUS_FAIL);
            }
        }
    }
}

#[async_trait]
impl<P: Producer, H: MetricsHandler> Producer for Instrumented<P, H> {
    type Item = P::Item;

    async fn produce(&self, token: &CancellationToken) -> Result<Self::Item> {
        let started = self.started();
        let result = self.inner.produce(token).await;
        self.finished(started, &result);
        result
    }
}

#[async_trait]
impl<M: Mapper, H: MetricsHandler> Mapper for Instrumented<M, H> {
    type Input = M::Input;
    type Output = M::Output;

    async fn map(&self, item: Self::Input) -> Result<Self::Output> {
        let started = self.started();
        let result = self.inner.map(item).await;
        self.finished(started, &result);
        result
    }
}

#[async_trait]
impl<S: Sink, H: MetricsHandler> Sink for Instrumented<S, H> {
    type Item = S::Item;

    async fn consume(&self, item: Self::Item) -> Result<()> {
        let started = self.started();
        let result = self.inner.consume(item).await;
        self.finished(started, &result);
        result
    }
}

/// Snapshot of one stage's counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageStats {
    pub records: u64,
    pub errors: u64,
    pub last_success: Option<SystemTime>,
    pub total_time: Duration,
    /// Number of timed executions per status
    pub executions: HashMap<String, u64>,
}

/// In-memory metrics keyed by `(service, stage)`
#[derive(Debug, Default)]
pub struct StageMetrics {
    stages: Mutex<HashMap<(String, String), StageStats>>,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counters of a stage, if it has been invoked
    pub fn stats(&self, service: &str, stage: &str) -> Option<StageStats> {
        self.lock()
            .get(&(service.to_string(), stage.to_string()))
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), StageStats>> {
        // counters stay usable even if a recording thread panicked
        self.stages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, service: &str, stage: &str, f: impl FnOnce(&mut StageStats)) {
        let mut stages = self.lock();
        f(stages
            .entry((service.to_string(), stage.to_string()))
            .or_default());
    }
}

impl MetricsHandler for StageMetrics {
    fn record_last_successful_execution(&self, service: &str, stage: &str) {
        self.update(service, stage, |s| s.last_success = Some(SystemTime::now()));
    }

    fn record_execution_time(&self, elapsed: Duration, service: &str, stage: &str, status: &str) {
        self.update(service, stage, |s| {
            s.total_time += elapsed;
            *s.executions.entry(status.to_string()).or_default() += 1;
        });
    }

    fn increment_record_count(&self, service: &str, stage: &str) {
        self.update(service, stage, |s| s.records += 1);
    }

    fn increment_error_count(&self, service: &str, stage: &str) {
        self.update(service, stage, |s| s.errors += 1);
    }
}

/// Forwards metric events to the `metrics` crate facade.
///
/// Emits `pipeworks_records_total`, `pipeworks_errors_total`,
/// `pipeworks_execution_seconds` (labelled by status) and
/// `pipeworks_last_success_timestamp`, all labelled by service and stage.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFacade;

#[cfg(feature = "metrics")]
impl MetricsHandler for MetricsFacade {
    fn record_last_successful_execution(&self, service: &str, stage: &str) {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        ::metrics::gauge!(
            "pipeworks_last_success_timestamp",
            "service" => service.to_string(),
            "stage" => stage.to_string()
        )
        .set(now);
    }

    fn record_execution_time(&self, elapsed: Duration, service: &str, stage: &str, status: &str) {
        ::metrics::histogram!(
            "pipeworks_execution_seconds",
            "service" => service.to_string(),
            "stage" => stage.to_string(),
            "status" => status.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    fn increment_record_count(&self, service: &str, stage: &str) {
        ::metrics::counter!(
            "pipeworks_records_total",
            "service" => service.to_string(),
            "stage" => stage.to_string()
        )
        .increment(1);
    }

    fn increment_error_count(&self, service: &str, stage: &str) {
        ::metrics::counter!(
            "pipeworks_errors_total",
            "service" => service.to_string(),
            "stage" => stage.to_string()
        )
        .increment(1);
    }
}
