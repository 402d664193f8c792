use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Process-wide counters fed by the global sink.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub ops: EventOps,
    pub fetches: BTreeMap<String, FetchCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            fetches: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Cursor lifecycle
    pub cursors_opened: u64,
    pub cursors_closed: u64,
    pub close_failures: u64,
    pub rows_read: u64,

    // Terminal strategies
    pub fetch_calls: u64,
    pub fetch_errors: u64,
    pub rows_returned: u64,

    // Delivery adapters
    pub async_submits: u64,
    pub stream_opens: u64,
    pub subscriptions: u64,
    pub native_subscriptions: u64,
}

///
/// FetchCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FetchCounters {
    pub calls: u64,
    pub errors: u64,
    pub rows: u64,
}

///
/// EventReport
/// Point-in-time copy of the counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub fetches: BTreeMap<String, FetchCounters>,
    pub since_ms: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    let mut state = EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner);

    f(&mut state)
}

pub(crate) fn report() -> EventReport {
    with_state_mut(|m| EventReport {
        ops: m.ops.clone(),
        fetches: m.fetches.clone(),
        since_ms: m.since_ms,
    })
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}
