//! Delayed events on a virtual clock.
//!
//! Nothing here sleeps. The owner advances the clock and receives whatever
//! came due, which keeps feedback delays testable and cancellable.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    token: TimerToken,
    due: Duration,
    event: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    next_token: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_token: 0,
            pending: Vec::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, event: T) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.pending.push(Scheduled {
            token,
            due: self.now + delay,
            event,
        });
        token
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.token != token);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Due time of the earliest pending event.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|s| s.due).min()
    }

    /// Remove and return the earliest event due at or before `deadline`.
    ///
    /// The clock moves to that event's due time, so anything scheduled while
    /// handling it is timed from the moment it fired.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<T> {
        let pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due <= deadline)
            .min_by_key(|(_, s)| (s.due, s.token))
            .map(|(i, _)| i)?;
        let fired = self.pending.remove(pos);
        self.now = self.now.max(fired.due);
        Some(fired.event)
    }

    /// Move the clock forward and collect everything that came due, in due order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<T> {
        let deadline = self.now + elapsed;
        let mut fired = Vec::new();
        while let Some(event) = self.pop_due(deadline) {
            fired.push(event);
        }
        self.now = deadline;
        fired
    }

    /// Set the clock without firing anything; never moves it backwards.
    pub fn advance_to(&mut self, instant: Duration) {
        self.now = self.now.max(instant);
    }
}
