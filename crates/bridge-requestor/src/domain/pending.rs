//! Pending call arena and timer handles.
//!
//! Two maps keyed by correlation id: the call records and the single live
//! timer per call. Both support interleaved insert/lookup/remove from the
//! listener task and timer tasks.
//!
//! Handlers that end a call must [`PendingTable::take`] the record before
//! doing anything else; whoever removes it owns the completion.

use crate::domain::errors::RequestorError;
use bridge_wire::{CallResponse, CorrelationId, Request};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Result delivered to the caller.
pub type CallResult = Result<CallResponse, RequestorError>;

/// Where a live call is in the correlation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Sent; reply timer running.
    Armed,
    /// Failed with retries left; resend scheduled.
    Retrying,
}

/// One in-flight logical call.
#[derive(Debug)]
pub struct PendingCall {
    pub id: CorrelationId,
    completion: oneshot::Sender<CallResult>,
    pub started_at: Instant,
    pub retry_count: u32,
    /// Original payload, resent verbatim on retry.
    pub request: Request,
    pub state: CallState,
    pub last_error: Option<RequestorError>,
}

impl PendingCall {
    pub fn new(id: CorrelationId, request: Request) -> (Self, oneshot::Receiver<CallResult>) {
        let (completion, rx) = oneshot::channel();
        let call = Self {
            id,
            completion,
            started_at: Instant::now(),
            retry_count: 0,
            request,
            state: CallState::Armed,
            last_error: None,
        };
        (call, rx)
    }

    /// Deliver the terminal result. `false` if the caller stopped waiting.
    pub fn complete(self, result: CallResult) -> bool {
        self.completion.send(result).is_ok()
    }
}

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Reply deadline for an attempt.
    Reply,
    /// Delay before resending.
    RetryDelay,
}

/// A scheduled callback bound to a correlation id.
#[derive(Debug)]
pub struct TimeoutHandle {
    pub id: CorrelationId,
    pub deadline: Instant,
    pub kind: TimerKind,
    /// Attempt this timer belongs to.
    pub attempt: u32,
    /// Unique per handle; lets a firing timer recognise itself.
    pub seq: u64,
    task: JoinHandle<()>,
}

impl TimeoutHandle {
    pub fn new(
        id: CorrelationId,
        deadline: Instant,
        kind: TimerKind,
        attempt: u32,
        seq: u64,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            deadline,
            kind,
            attempt,
            seq,
            task,
        }
    }

    /// Stop the timer. It will not fire.
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// The requestor's shared mutable state.
#[derive(Debug, Default)]
pub struct PendingTable {
    calls: DashMap<CorrelationId, PendingCall>,
    timers: DashMap<CorrelationId, TimeoutHandle>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, call: PendingCall) {
        self.calls.insert(call.id.clone(), call);
    }

    /// Remove and return a call record.
    pub fn take(&self, id: &CorrelationId) -> Option<PendingCall> {
        self.calls.remove(id).map(|(_, call)| call)
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.calls.contains_key(id)
    }

    /// Run `f` on a live record. The shard lock is released before returning,
    /// so `f` must not touch this table.
    pub fn with_call_mut<R>(
        &self,
        id: &CorrelationId,
        f: impl FnOnce(&mut PendingCall) -> R,
    ) -> Option<R> {
        let mut entry = self.calls.get_mut(id)?;
        Some(f(entry.value_mut()))
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Install the timer for a call, cancelling whichever one it replaces.
    pub fn arm(&self, handle: TimeoutHandle) {
        if let Some(previous) = self.timers.insert(handle.id.clone(), handle) {
            previous.cancel();
        }
    }

    /// Install the timer `make` builds while the call's slot is locked, so
    /// the timer cannot fire before it is registered.
    pub fn arm_with(&self, id: &CorrelationId, make: impl FnOnce() -> TimeoutHandle) {
        let previous = match self.timers.entry(id.clone()) {
            Entry::Occupied(mut slot) => Some(slot.insert(make())),
            Entry::Vacant(slot) => {
                slot.insert(make());
                None
            }
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Cancel a call's timer, if any.
    pub fn cancel_timer(&self, id: &CorrelationId) -> bool {
        match self.timers.remove(id) {
            Some((_, handle)) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Called by a firing timer: unregister it if it is still the live one.
    ///
    /// `false` means the timer was cancelled or replaced and must do nothing.
    pub fn release_timer(&self, id: &CorrelationId, seq: u64) -> bool {
        self.timers.remove_if(id, |_, h| h.seq == seq).is_some()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Remove every call and cancel every timer.
    pub fn drain(&self) -> Vec<PendingCall> {
        let timer_ids: Vec<CorrelationId> = self.timers.iter().map(|e| e.key().clone()).collect();
        for id in timer_ids {
            self.cancel_timer(&id);
        }

        let call_ids: Vec<CorrelationId> = self.calls.iter().map(|e| e.key().clone()).collect();
        call_ids.iter().filter_map(|id| self.take(id)).collect()
    }
}
