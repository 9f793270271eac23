//! Clock and timer abstractions.
//!
//! A page runs all of its timers on one logical thread. The segmenter only
//! registers and cancels timers through [`Scheduler`]; a driver decides when
//! they fire. [`TimerTable`] is the scheduler used by both the real-time
//! runtime and the virtual-time driver in tests and simulation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Source of monotonic and wall-clock time for a page.
pub trait Clock: Send + Sync {
    /// Monotonic milliseconds since the clock's origin.
    fn now_ms(&self) -> u64;

    /// Current wall-clock time.
    fn wall(&self) -> DateTime<Utc>;
}

/// Real clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl VirtualClock {
    /// Creates a clock at t=0 whose wall time starts at `epoch`.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            epoch,
        }
    }

    /// Moves time to `ms`. Time never goes backwards.
    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn wall(&self) -> DateTime<Utc> {
        let offset = i64::try_from(self.now_ms()).unwrap_or(i64::MAX);
        self.epoch + Duration::milliseconds(offset)
    }
}

/// The repeating timers a segmenter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Pointer position sampler.
    Sample,
    /// Periodic flush.
    Flush,
    /// Idle detection.
    IdleCheck,
}

/// Handle to a registered timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Registers and cancels repeating timers.
pub trait Scheduler: Send {
    fn schedule_repeating(&mut self, timer: Timer, period_ms: u64) -> TimerId;

    /// Cancels a timer. Cancelling an unknown id is a no-op.
    fn cancel(&mut self, id: TimerId);
}

#[derive(Debug)]
struct Entry {
    timer: Timer,
    period_ms: u64,
    next_due: u64,
}

#[derive(Debug, Default)]
struct TableInner {
    next_id: u64,
    entries: BTreeMap<TimerId, Entry>,
}

/// Shared table of repeating timers. Clones refer to the same table.
#[derive(Clone)]
pub struct TimerTable {
    inner: Arc<Mutex<TableInner>>,
    clock: Arc<dyn Clock>,
}

impl TimerTable {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TableInner::default())),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Earliest due time among registered timers.
    pub fn next_due(&self) -> Option<u64> {
        self.lock().entries.values().map(|e| e.next_due).min()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Takes the earliest timer due at or before `now`, rescheduling it one
    /// period later. Ties fire in registration order.
    pub fn pop_due(&self, now: u64) -> Option<(u64, Timer)> {
        let mut inner = self.lock();
        let (id, due) = inner
            .entries
            .iter()
            .filter(|(_, e)| e.next_due <= now)
            .min_by_key(|(id, e)| (e.next_due, **id))
            .map(|(id, e)| (*id, e.next_due))?;
        let entry = inner.entries.get_mut(&id)?;
        entry.next_due = due + entry.period_ms;
        Some((due, entry.timer))
    }

    /// Fires every timer due up to `until` on virtual time, in due order.
    ///
    /// The clock is moved to each timer's due time before `fire` runs, and to
    /// `until` once no timer is left due. Timers scheduled or cancelled by
    /// `fire` take effect immediately.
    pub fn run_until(&self, clock: &VirtualClock, until: u64, mut fire: impl FnMut(Timer)) {
        while let Some((at, timer)) = self.pop_due(until) {
            clock.set(at);
            fire(timer);
        }
        clock.set(until);
    }
}

impl Scheduler for TimerTable {
    fn schedule_repeating(&mut self, timer: Timer, period_ms: u64) -> TimerId {
        let period_ms = period_ms.max(1);
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = TimerId(inner.next_id);
        inner.entries.insert(
            id,
            Entry {
                timer,
                period_ms,
                next_due: now + period_ms,
            },
        );
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.lock().entries.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> (VirtualClock, TimerTable) {
        let clock = VirtualClock::new(DateTime::<Utc>::UNIX_EPOCH);
        let table = TimerTable::new(Arc::new(clock.clone()));
        (clock, table)
    }

    #[test]
    fn virtual_clock_wall_time_follows_monotonic_time() {
        let clock = VirtualClock::new(DateTime::<Utc>::UNIX_EPOCH);
        clock.advance(1500);
        assert_eq!(clock.now_ms(), 1500);
        assert_eq!(clock.wall().timestamp_millis(), 1500);
        clock.set(1000);
        assert_eq!(clock.now_ms(), 1500, "time must not go backwards");
    }

    #[test]
    fn timers_fire_in_due_order() {
        let (clock, mut table) = table();
        table.schedule_repeating(Timer::Flush, 50);
        table.schedule_repeating(Timer::Sample, 20);

        let mut fired = Vec::new();
        table.run_until(&clock, 100, |timer| fired.push((clock.now_ms(), timer)));

        assert_eq!(
            fired,
            vec![
                (20, Timer::Sample),
                (40, Timer::Sample),
                (50, Timer::Flush),
                (60, Timer::Sample),
                (80, Timer::Sample),
                (100, Timer::Flush),
                (100, Timer::Sample),
            ]
        );
        assert_eq!(clock.now_ms(), 100);
    }

    #[test]
    fn cancelled_timer_does_not_fire() {
        let (clock, mut table) = table();
        let id = table.schedule_repeating(Timer::IdleCheck, 10);
        table.cancel(id);
        assert!(table.is_empty());

        let mut fired = 0;
        table.run_until(&clock, 100, |_| fired += 1);
        assert_eq!(fired, 0);
        assert_eq!(table.next_due(), None);
    }

    #[test]
    fn zero_period_is_clamped() {
        let (clock, mut table) = table();
        table.schedule_repeating(Timer::Sample, 0);
        assert_eq!(table.next_due(), Some(clock.now_ms() + 1));
    }
}
