//! Virtual-time timer queue.
//!
//! The engine never sleeps. Every delay (typewriter ticks, gate timers,
//! auto-advance) is a [`Timer`] in this queue, and time only moves when the
//! owner calls [`Scheduler::pop_due`] with a later instant. That keeps the
//! state machine single-threaded and deterministic; an async driver maps
//! real time onto it.

use crate::host::GateId;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Timer {
    /// Reveal the next unit of the current render.
    Typewriter,
    /// A timed gate (delay, timed highlight) has elapsed.
    Gate(GateId),
    /// A satisfied gate's post-delay has elapsed.
    PostGate(GateId),
    /// Auto-advance check for the step entered at `epoch`.
    AutoAdvance { epoch: u64 },
}

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), Timer>,
    deadlines: HashMap<u64, Duration>,
}

impl Scheduler {
    /// Time elapsed on the virtual clock.
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn schedule(&mut self, delay: Duration, timer: Timer) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = self.now.saturating_add(delay);
        self.queue.insert((deadline, seq), timer);
        self.deadlines.insert(seq, deadline);
        TimerId(seq)
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(deadline) => self.queue.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    /// Remove the earliest timer due at or before `until`, moving the clock
    /// to its deadline. Timers with equal deadlines come out in scheduling order.
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<Timer> {
        let (&(deadline, seq), _) = self.queue.first_key_value()?;
        if deadline > until {
            return None;
        }
        let timer = self.queue.remove(&(deadline, seq))?;
        self.deadlines.remove(&seq);
        self.now = self.now.max(deadline);
        Some(timer)
    }

    /// Move the clock forward to `to` without firing anything.
    pub(crate) fn settle(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    /// Delay until the earliest pending timer.
    pub(crate) fn next_in(&self) -> Option<Duration> {
        self.queue
            .first_key_value()
            .map(|(&(deadline, _), _)| deadline.saturating_sub(self.now))
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let mut s = Scheduler::default();
        s.schedule(ms(30), Timer::AutoAdvance { epoch: 3 });
        s.schedule(ms(10), Timer::AutoAdvance { epoch: 1 });
        s.schedule(ms(20), Timer::AutoAdvance { epoch: 2 });

        assert_eq!(s.pop_due(ms(25)), Some(Timer::AutoAdvance { epoch: 1 }));
        assert_eq!(s.now(), ms(10));
        assert_eq!(s.pop_due(ms(25)), Some(Timer::AutoAdvance { epoch: 2 }));
        assert_eq!(s.pop_due(ms(25)), None);
        assert_eq!(s.next_in(), Some(ms(10)));
    }

    #[test]
    fn test_equal_deadlines_fire_fifo() {
        let mut s = Scheduler::default();
        s.schedule(Duration::ZERO, Timer::Typewriter);
        s.schedule(Duration::ZERO, Timer::AutoAdvance { epoch: 0 });
        assert_eq!(s.pop_due(Duration::ZERO), Some(Timer::Typewriter));
        assert_eq!(s.pop_due(Duration::ZERO), Some(Timer::AutoAdvance { epoch: 0 }));
    }

    #[test]
    fn test_cancel() {
        let mut s = Scheduler::default();
        let id = s.schedule(ms(5), Timer::Typewriter);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert_eq!(s.pending(), 0);
        assert_eq!(s.pop_due(ms(100)), None);
    }

    #[test]
    fn test_schedule_is_relative_to_now() {
        let mut s = Scheduler::default();
        s.settle(ms(100));
        s.schedule(ms(50), Timer::Typewriter);
        assert_eq!(s.pop_due(ms(149)), None);
        assert_eq!(s.pop_due(ms(150)), Some(Timer::Typewriter));
    }
}
