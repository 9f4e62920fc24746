//! Logical clock with cancellable timers.
//!
//! Time only moves when the owner asks for it. Timers fire in due-time order;
//! timers due at the same moment fire in the order they were scheduled.

use std::collections::BTreeMap;

/// Handle to a scheduled timer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct TimerHandle {
    due: u64,
    seq: u64,
}

impl TimerHandle {
    /// Logical time (ms) at which the timer fires.
    pub fn due(self) -> u64 {
        self.due
    }
}

#[derive(Debug)]
pub struct Clock<E> {
    now: u64,
    next_seq: u64,
    timers: BTreeMap<(u64, u64), E>,
}

impl<E> Default for Clock<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clock<E> {
    pub fn new() -> Self {
        Clock {
            now: 0,
            next_seq: 0,
            timers: BTreeMap::new(),
        }
    }

    /// Current logical time in ms.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule `event` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        let handle = TimerHandle {
            due: self.now + delay_ms,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.timers.insert((handle.due, handle.seq), event);
        handle
    }

    /// Cancel a pending timer, returning its event. Cancelling a timer that
    /// already fired or was cancelled does nothing.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<E> {
        self.timers.remove(&(handle.due, handle.seq))
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&(handle.due, handle.seq))
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|&(due, _)| due)
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Remove the earliest timer due at or before `until` and move the clock
    /// to its due time.
    pub fn pop_due(&mut self, until: u64) -> Option<(TimerHandle, E)> {
        let (&(due, seq), _) = self.timers.first_key_value()?;
        if due > until {
            return None;
        }
        let (_, event) = self.timers.pop_first()?;
        self.now = self.now.max(due);
        Some((TimerHandle { due, seq }, event))
    }

    /// Move the clock forward to `until` without firing anything.
    pub fn advance_to(&mut self, until: u64) {
        self.now = self.now.max(until);
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
