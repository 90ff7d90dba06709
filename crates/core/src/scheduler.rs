//! Timer scheduling
//!
//! Two implementations of the `Scheduler` capability:
//! - `VirtualClock`: manual time, advanced explicitly. Deterministic, used by
//!   tests, benchmarks and any host that drives its own event loop.
//! - `TokioScheduler`: one sleeping task per timer on a tokio runtime.

use crate::error::HostError;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Deferred work run when a timer expires
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Timer capability: schedule and cancel delayed invocations
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a timer that has not fired yet
    ///
    /// Returns false if the timer already fired or was already cancelled.
    fn cancel(&self, id: TimerId) -> bool;
}

/// Manually advanced clock
///
/// Time only moves when `advance`/`advance_to` is called. Timers run in due
/// order; timers with the same due time run in scheduling order. While a
/// timer runs, `now()` reports its due time.
pub struct VirtualClock {
    state: Mutex<ClockState>,
}

struct ClockState {
    /// Current virtual time
    now: Duration,
    /// Next timer id (doubles as the scheduling sequence number)
    next_id: u64,
    /// Pending timers keyed by (due time, id)
    queue: BTreeMap<(Duration, TimerId), Task>,
    /// Due time of each pending timer
    due_of: AHashMap<TimerId, Duration>,
}

impl VirtualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                now: Duration::ZERO,
                next_id: 1,
                queue: BTreeMap::new(),
                due_of: AHashMap::new(),
            }),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<Duration> {
        self.state
            .lock()
            .queue
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }

    /// Move time forward by `by`, running every timer that comes due
    ///
    /// Returns the number of timers that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now() + by;
        self.advance_to(deadline)
    }

    /// Move time forward to `deadline`, running every timer that comes due
    ///
    /// A deadline in the past runs nothing and leaves time unchanged.
    pub fn advance_to(&self, deadline: Duration) -> usize {
        let mut fired = 0;

        loop {
            let task = {
                let mut state = self.state.lock();
                match state.queue.first_key_value() {
                    Some((&(due, _), _)) if due <= deadline => {}
                    _ => {
                        state.now = state.now.max(deadline);
                        break;
                    }
                }
                let Some(((due, id), task)) = state.queue.pop_first() else {
                    break;
                };
                state.due_of.remove(&id);
                state.now = due;
                task
            };

            // Lock released: the task may schedule or cancel timers
            task();
            fired += 1;
        }

        fired
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualClock {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.lock();
        let id = TimerId(state.next_id);
        state.next_id += 1;

        let due = state.now + delay;
        state.queue.insert((due, id), task);
        state.due_of.insert(id, due);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        match state.due_of.remove(&id) {
            Some(due) => state.queue.remove(&(due, id)).is_some(),
            None => false,
        }
    }
}

/// Scheduler backed by a tokio runtime
///
/// Each timer is a spawned task that sleeps for the delay and then runs the
/// work. Cancellation aborts the sleeping task.
pub struct TokioScheduler {
    /// Runtime the timer tasks are spawned on
    handle: Handle,
    /// Monotonic id counter
    next_id: AtomicU64,
    /// Abort handles of timers that have not fired yet
    timers: Arc<Mutex<AHashMap<TimerId, AbortHandle>>>,
}

impl TokioScheduler {
    /// Create a scheduler on an explicit runtime handle
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            next_id: AtomicU64::new(1),
            timers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Create a scheduler on the runtime the caller is running in
    pub fn current() -> crate::Result<Self> {
        let handle = Handle::try_current().map_err(|e| HostError::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle))
    }

    /// Number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // Hold the table lock across spawn so the task can't finish and
        // remove its entry before the entry exists
        let mut timers = self.timers.lock();
        let table = Arc::clone(&self.timers);
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if table.lock().remove(&id).is_some() {
                task();
            }
        });
        timers.insert(id, join.abort_handle());

        trace!("Scheduled timer {:?} in {:?}", id, delay);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.timers.lock().remove(&id) {
            Some(handle) => {
                handle.abort();
                trace!("Cancelled timer {:?}", id);
                true
            }
            None => false,
        }
    }
}
