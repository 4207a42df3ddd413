use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// EventState
/// Ephemeral, in-memory counters for codec operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub(crate) ops: EventOps,
    pub(crate) last_rejected_line: Option<u64>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Encoding
    pub tree_encodes: u64,
    pub flat_encodes: u64,
    pub encoded_lines: u64,
    pub encodes_with_stats: u64,

    // Normalization
    pub tree_normalizations: u64,
    pub flat_normalizations: u64,
    pub normalized_nodes: u64,

    // Decoding
    pub decodes: u64,
    pub decoded_lines: u64,
    pub decode_rejections: u64,

    // Absent plans, per surface
    pub tree_unavailable: u64,
    pub flat_unavailable: u64,
}

///
/// EventReport
/// Point-in-time snapshot returned to callers.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub counters: EventOps,

    /// 1-based line of the most recent decode rejection.
    pub last_rejected_line: Option<u64>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

pub(crate) fn report() -> EventReport {
    with_state(|m| EventReport {
        counters: m.ops.clone(),
        last_rejected_line: m.last_rejected_line,
    })
}
