//! Push-based delivery with subscriber demand.
//!
//! A subscription picks its producer once, from the query's streaming
//! capability. Blocking replay fetches the whole result on a worker and then
//! pushes rows as demand allows. Native streaming polls the non-blocking
//! source only while demand is outstanding. Either way, cancelling stops
//! delivery and the source is closed exactly once. Dropping every
//! `Subscription` handle ends the subscription once outstanding demand is
//! spent, since no further demand can arrive.

use crate::{
    deliver::future::{WorkerPool, default_pool},
    error::{ErrorClass, ErrorOrigin, InternalError},
    fetch::strategy,
    obs::{DeliveryKind, MetricsEvent, sink::record},
    row::Row,
    source::{NativeRowSource, ResultQuery, StreamingCapability},
};
use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::Notify;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

///
/// Subscriber
///
/// Receives at most one terminal signal (`on_error` or `on_complete`), and
/// no `on_next` beyond what it has requested.
///

pub trait Subscriber<T>: Send + 'static {
    fn on_subscribe(&mut self, subscription: Subscription);

    fn on_next(&mut self, item: T);

    fn on_error(&mut self, error: InternalError);

    fn on_complete(&mut self);
}

///
/// Permit
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Permit {
    Granted,
    Cancelled,
    Violation,
}

///
/// DemandState
///

#[derive(Debug, Default)]
struct DemandState {
    requested: u64,
    cancelled: bool,
    violation: bool,
    abandoned: bool,
}

impl DemandState {
    fn take(&mut self) -> Option<Permit> {
        if self.cancelled {
            return Some(Permit::Cancelled);
        }
        if self.violation {
            return Some(Permit::Violation);
        }
        if self.requested == 0 {
            // Abandoned with no demand left: nothing can ever be granted.
            return self.abandoned.then_some(Permit::Cancelled);
        }
        // u64::MAX stands for unbounded demand.
        if self.requested != u64::MAX {
            self.requested -= 1;
        }

        Some(Permit::Granted)
    }
}

///
/// DemandGate
/// Shared between the subscriber's handle and the producer.
///

#[derive(Debug, Default)]
struct DemandGate {
    state: Mutex<DemandState>,
    ready: Condvar,
    demand: Notify,
    cancel: Notify,
}

impl DemandGate {
    fn lock(&self) -> MutexGuard<'_, DemandState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut DemandState)) {
        f(&mut self.lock());
        self.ready.notify_all();
        self.demand.notify_one();
    }

    fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    fn acquire_blocking(&self) -> Permit {
        let mut state = self.lock();
        loop {
            if let Some(permit) = state.take() {
                return permit;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    async fn acquire(&self) -> Permit {
        loop {
            let permit = self.lock().take();
            if let Some(permit) = permit {
                return permit;
            }
            self.demand.notified().await;
        }
    }

    async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.cancel.notified().await;
        }
    }
}

///
/// SubscriptionHandle
/// Shared by every clone of one `Subscription`; dropping the last clone
/// abandons the gate.
///

struct SubscriptionHandle {
    gate: Arc<DemandGate>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.gate.update(|state| state.abandoned = true);
    }
}

///
/// Subscription
///
/// The subscriber's handle on demand and cancellation. Cheap to clone.
///

#[derive(Clone)]
pub struct Subscription {
    handle: Arc<SubscriptionHandle>,
}

impl Subscription {
    fn new(gate: Arc<DemandGate>) -> Self {
        Self {
            handle: Arc::new(SubscriptionHandle { gate }),
        }
    }

    fn gate(&self) -> &DemandGate {
        &self.handle.gate
    }

    /// Request `n` more items. `n == 0` is a protocol violation and ends the
    /// subscription with `on_error`.
    pub fn request(&self, n: u64) {
        self.gate().update(|state| {
            if n == 0 {
                state.violation = true;
            } else {
                state.requested = state.requested.saturating_add(n);
            }
        });
    }

    /// Stop delivery. Idempotent.
    pub fn cancel(&self) {
        self.gate().update(|state| state.cancelled = true);
        self.gate().cancel.notify_one();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.gate().is_cancelled()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.gate().lock();

        f.debug_struct("Subscription")
            .field("requested", &state.requested)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

fn zero_request() -> InternalError {
    InternalError::new(
        ErrorClass::InvariantViolation,
        ErrorOrigin::Delivery,
        "subscription request must be greater than zero",
    )
}

/// Subscribe on the default pool.
pub(crate) fn subscribe<Q, S>(query: Q, subscriber: S)
where
    Q: ResultQuery + Send + 'static,
    S: Subscriber<Row>,
{
    match default_pool(query.config()) {
        Ok(pool) => subscribe_on(query, &pool, subscriber),
        Err(err) => fail_immediately(subscriber, err),
    }
}

/// Subscribe with an explicit pool.
pub(crate) fn subscribe_on<Q, P, S>(query: Q, pool: &P, subscriber: S)
where
    Q: ResultQuery + Send + 'static,
    P: WorkerPool + ?Sized,
    S: Subscriber<Row>,
{
    let capability = query.streaming_capability();
    record(MetricsEvent::Delivery {
        kind: DeliveryKind::Subscribe {
            native: capability == StreamingCapability::NativeStreaming,
        },
    });

    match capability {
        StreamingCapability::BlockingOnly => blocking_replay(query, pool, subscriber),
        StreamingCapability::NativeStreaming => {
            let runtime = match pool.runtime() {
                Some(handle) => Ok(handle),
                None => default_pool(query.config()),
            };
            match runtime {
                Ok(handle) => {
                    let (gate, subscriber) = start(subscriber);
                    drop(handle.spawn(native(query, gate, subscriber)));
                }
                Err(err) => fail_immediately(subscriber, err),
            }
        }
    }
}

// The producer keeps the gate itself, never a `Subscription`, so only the
// subscriber's handles count towards abandonment.
fn start<S: Subscriber<Row>>(mut subscriber: S) -> (Arc<DemandGate>, S) {
    let gate = Arc::new(DemandGate::default());
    subscriber.on_subscribe(Subscription::new(Arc::clone(&gate)));

    (gate, subscriber)
}

fn fail_immediately<S: Subscriber<Row>>(subscriber: S, err: InternalError) {
    let (_, mut subscriber) = start(subscriber);
    subscriber.on_error(err);
}

fn blocking_replay<Q, P, S>(query: Q, pool: &P, subscriber: S)
where
    Q: ResultQuery + Send + 'static,
    P: WorkerPool + ?Sized,
    S: Subscriber<Row>,
{
    let (gate, mut subscriber) = start(subscriber);

    pool.submit(Box::new(move || {
        // The fetch itself is not demand-gated; only delivery is.
        let rows = match strategy::all(&query) {
            Ok(rows) => rows,
            Err(err) => {
                if !gate.is_cancelled() {
                    subscriber.on_error(err);
                }
                return;
            }
        };

        let mut delivered = 0usize;
        for row in rows {
            match gate.acquire_blocking() {
                Permit::Granted => {
                    subscriber.on_next(row);
                    delivered += 1;
                }
                Permit::Cancelled => {
                    debug!(delivered, "blocking subscription cancelled");
                    return;
                }
                Permit::Violation => {
                    subscriber.on_error(zero_request());
                    return;
                }
            }
        }

        if !gate.is_cancelled() {
            subscriber.on_complete();
        }
    }));
}

fn close_native(
    source: &mut dyn NativeRowSource,
    primary: Option<&InternalError>,
) -> Result<(), InternalError> {
    match (source.close(), primary) {
        (Err(close), Some(primary)) => {
            warn!(
                primary = %primary.display_with_class(),
                close = %close.display_with_class(),
                "native source close failed behind a primary error"
            );
            Ok(())
        }
        (result, _) => result,
    }
}

async fn native<Q, S>(query: Q, gate: Arc<DemandGate>, mut subscriber: S)
where
    Q: ResultQuery + Send + 'static,
    S: Subscriber<Row>,
{
    let mut source = match query.open_native() {
        Ok(source) => source,
        Err(err) => {
            subscriber.on_error(err);
            return;
        }
    };

    let mut delivered = 0usize;
    let outcome = loop {
        match gate.acquire().await {
            Permit::Granted => {}
            Permit::Cancelled => break None,
            Permit::Violation => break Some(Err(zero_request())),
        }

        let item = tokio::select! {
            biased;
            () = gate.cancelled() => break None,
            item = source.next() => item,
        };

        match item {
            Some(Ok(row)) => {
                subscriber.on_next(row);
                delivered += 1;
            }
            Some(Err(err)) => break Some(Err(err)),
            None => break Some(Ok(())),
        }
    };

    // Every exit path reaches exactly one close.
    match outcome {
        None => {
            debug!(delivered, "native subscription cancelled");
            if let Err(err) = close_native(source.as_mut(), None) {
                warn!(error = %err.display_with_class(), "native source close failed after cancel");
            }
        }
        Some(Ok(())) => match close_native(source.as_mut(), None) {
            Ok(()) => subscriber.on_complete(),
            Err(err) => subscriber.on_error(err),
        },
        Some(Err(err)) => {
            let _ = close_native(source.as_mut(), Some(&err));
            subscriber.on_error(err);
        }
    }
}
