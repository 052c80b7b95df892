//! Sequence-number tracking for stream consumers.
//!
//! Every change event carries a sequence number that is strictly increasing
//! within one reconciler instance. Consumers feed the numbers into a
//! [`SeqTracker`] to detect dropped frames (a lagged session) and duplicate
//! delivery. A gap is not an error: the next reconciler cycle re-derives
//! current state, so the consumer only needs to know its view may be stale.

/// Result of observing one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// `seq == 0`: a snapshot frame sent during the handshake, outside the
    /// reconciler's sequence space. Not tracked.
    Snapshot,
    /// The next expected number (or the first one seen).
    InOrder,
    /// One or more events were dropped before this one.
    Gap { missed: u64 },
    /// This sequence number was already observed.
    Duplicate,
}

/// Tracks the last observed sequence number of one stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqTracker {
    last: Option<u64>,
}

impl SeqTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed sequence number and classify it.
    pub fn observe(&mut self, seq: u64) -> SeqCheck {
        if seq == 0 {
            return SeqCheck::Snapshot;
        }
        let check = match self.last {
            None => SeqCheck::InOrder,
            Some(last) if seq <= last => return SeqCheck::Duplicate,
            Some(last) if seq == last + 1 => SeqCheck::InOrder,
            Some(last) => SeqCheck::Gap {
                missed: seq - last - 1,
            },
        };
        self.last = Some(seq);
        check
    }

    /// The last non-snapshot sequence number seen, if any.
    pub fn last_seen(&self) -> Option<u64> {
        self.last
    }
}
