//! # Reply Ledger
//!
//! Tracks which correlation ids are being executed or have been answered, so
//! an id receives exactly one terminal reply even when the requestor resends
//! it while the first attempt is still running.
//!
//! - In-flight ids are never evicted; their execution is time-bounded.
//! - Ids answered with a response are remembered for the retention window.
//! - Ids answered with an error are released: a later resend is a fresh
//!   attempt the requestor chose to make.

use bridge_wire::CorrelationId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Decision for an inbound request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Execute it.
    Accepted,
    /// Same id is still executing.
    InFlight,
    /// Same id was already answered.
    AlreadyAnswered,
}

/// How an accepted request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Response,
    Error,
}

#[derive(Debug, Clone, Copy)]
enum EntryState {
    InFlight,
    Answered { at: Instant },
}

/// Time-bounded record of admitted correlation ids.
pub struct ReplyLedger {
    entries: HashMap<CorrelationId, EntryState>,
    retention: Duration,
    gc_interval: Duration,
    last_gc: Instant,
}

impl ReplyLedger {
    /// Default retention for answered ids.
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60);

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

    pub fn new(retention: Duration) -> Self {
        Self::with_config(retention, Self::DEFAULT_GC_INTERVAL)
    }

    pub fn with_config(retention: Duration, gc_interval: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retention,
            gc_interval,
            last_gc: Instant::now(),
        }
    }

    /// Check an inbound id and mark it in flight if accepted.
    pub fn admit(&mut self, id: &CorrelationId, now: Instant) -> Admission {
        if now.saturating_duration_since(self.last_gc) >= self.gc_interval {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        match self.entries.get(id) {
            Some(EntryState::InFlight) => Admission::InFlight,
            Some(EntryState::Answered { at })
                if now.saturating_duration_since(*at) < self.retention =>
            {
                Admission::AlreadyAnswered
            }
            _ => {
                self.entries.insert(id.clone(), EntryState::InFlight);
                Admission::Accepted
            }
        }
    }

    /// Record the terminal reply for an admitted id.
    pub fn complete(&mut self, id: &CorrelationId, outcome: ReplyOutcome, now: Instant) {
        match outcome {
            ReplyOutcome::Response => {
                self.entries
                    .insert(id.clone(), EntryState::Answered { at: now });
            }
            ReplyOutcome::Error => {
                self.entries.remove(id);
            }
        }
    }

    /// Drop answered ids older than the retention window.
    pub fn garbage_collect(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let retention = self.retention;
        self.entries.retain(|_, state| match state {
            EntryState::InFlight => true,
            EntryState::Answered { at } => now.saturating_duration_since(*at) < retention,
        });
        before - self.entries.len()
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, EntryState::InFlight))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReplyLedger {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RETENTION)
    }
}
