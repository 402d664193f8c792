//! Future-based delivery: a blocking fetch handed to a worker pool.

use crate::{
    config::FetchConfig,
    error::InternalError,
    obs::{DeliveryKind, MetricsEvent, sink::record},
};
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, OnceLock},
    task::{Context, Poll},
};
use tokio::{
    runtime::{Builder, Handle, Runtime},
    sync::oneshot,
};
use tracing::debug;

/// A unit of blocking work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

static DEFAULT_RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();

///
/// WorkerPool
///
/// Where blocking fetches run. Submission must not block the caller.
///

pub trait WorkerPool: Send + Sync {
    fn submit(&self, job: Job);

    /// Runtime able to drive non-blocking sources, if the pool has one.
    fn runtime(&self) -> Option<Handle> {
        None
    }
}

impl WorkerPool for Handle {
    fn submit(&self, job: Job) {
        // Detached; completion is reported through the job's own channel.
        drop(self.spawn_blocking(job));
    }

    fn runtime(&self) -> Option<Handle> {
        Some(self.clone())
    }
}

impl<P: WorkerPool + ?Sized> WorkerPool for Arc<P> {
    fn submit(&self, job: Job) {
        (**self).submit(job);
    }

    fn runtime(&self) -> Option<Handle> {
        (**self).runtime()
    }
}

impl<P: WorkerPool + ?Sized> WorkerPool for &P {
    fn submit(&self, job: Job) {
        (**self).submit(job);
    }

    fn runtime(&self) -> Option<Handle> {
        (**self).runtime()
    }
}

/// The ambient tokio runtime, or a crate-owned one built on first use from
/// the given config.
pub fn default_pool(config: &FetchConfig) -> Result<Handle, InternalError> {
    if let Ok(handle) = Handle::try_current() {
        return Ok(handle);
    }

    let runtime = DEFAULT_RUNTIME.get_or_init(|| {
        debug!(
            worker_threads = config.worker_threads,
            thread_name = %config.thread_name,
            "building default fetch runtime"
        );

        Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name(config.thread_name.clone())
            .build()
            .map_err(|err| err.to_string())
    });

    match runtime {
        Ok(runtime) => Ok(runtime.handle().clone()),
        Err(message) => Err(InternalError::delivery_internal(format!(
            "default fetch runtime unavailable: {message}"
        ))),
    }
}

///
/// FetchHandle
///
/// Completion handle of an asynchronous fetch. Await it from async code or
/// `wait` on it from a plain thread. Dropping it does not stop a fetch
/// that is already running.
///

#[derive(Debug)]
pub struct FetchHandle<T> {
    rx: oneshot::Receiver<Result<T, InternalError>>,
}

impl<T> FetchHandle<T> {
    /// Block the current thread until the fetch completes.
    ///
    /// Must not be called from inside an async context.
    pub fn wait(self) -> Result<T, InternalError> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(worker_lost()))
    }

    pub(crate) fn failed(err: InternalError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));

        Self { rx }
    }
}

impl<T> Future for FetchHandle<T> {
    type Output = Result<T, InternalError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(worker_lost())))
    }
}

fn worker_lost() -> InternalError {
    InternalError::delivery_internal("fetch worker stopped before completing")
}

/// Run `job` on the pool and hand back its completion handle.
pub(crate) fn spawn<P, T, F>(pool: &P, job: F) -> FetchHandle<T>
where
    P: WorkerPool + ?Sized,
    T: Send + 'static,
    F: FnOnce() -> Result<T, InternalError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    record(MetricsEvent::Delivery {
        kind: DeliveryKind::Future,
    });

    pool.submit(Box::new(move || {
        // The receiver may be gone; the result is simply discarded then.
        let _ = tx.send(job());
    }));

    FetchHandle { rx }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    struct Inline;

    impl WorkerPool for Inline {
        fn submit(&self, job: Job) {
            job();
        }
    }

    struct Discarding;

    impl WorkerPool for Discarding {
        fn submit(&self, job: Job) {
            drop(job);
        }
    }

    #[test]
    fn inline_pool_completes_before_wait() {
        let handle = spawn(&Inline, || Ok(7));

        assert_eq!(handle.wait(), Ok(7));
    }

    #[test]
    fn dropped_job_reports_internal_delivery_error() {
        let handle = spawn(&Discarding, || Ok(1));
        let err = handle.wait().expect_err("job never ran");

        assert_eq!(err.class, ErrorClass::Internal);
    }

    #[test]
    fn default_pool_builds_a_runtime_outside_tokio() {
        let pool = default_pool(&FetchConfig::default()).expect("runtime");

        assert_eq!(spawn(&pool, || Ok("done")).wait(), Ok("done"));
    }

    #[tokio::test]
    async fn handle_is_awaitable_on_the_ambient_runtime() {
        let pool = default_pool(&FetchConfig::default()).expect("ambient runtime");
        let result = spawn(&pool, || Ok::<_, InternalError>(vec![1, 2, 3])).await;

        assert_eq!(result, Ok(vec![1, 2, 3]));
    }
}
