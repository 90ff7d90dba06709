//! Debounce primitive
//!
//! Collapses repeated calls within a quiet window into one deferred
//! invocation carrying the latest argument. The watcher composes two of
//! these: one absorbs bursts of raw events into pulses, the other turns the
//! end of a stream of pulses into a single idle notification.

use idlewatch_core::{Scheduler, TimerId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Debounced wrapper around a function of one argument
pub struct Debouncer<T> {
    /// Quiet window before the trailing invocation
    delay: Duration,
    /// Also invoke synchronously when nothing is pending
    leading: bool,
    scheduler: Arc<dyn Scheduler>,
    func: Arc<dyn Fn(T) + Send + Sync>,
    state: Arc<Mutex<DebounceState>>,
}

#[derive(Default)]
struct DebounceState {
    /// Timer of the invocation waiting to run
    pending: Option<TimerId>,
    /// Bumped on every call and cancel; a task only runs if its generation is current
    generation: u64,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + 'static,
{
    /// Trailing-only debouncer
    pub fn new<F>(delay: Duration, scheduler: Arc<dyn Scheduler>, func: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_leading(delay, false, scheduler, func)
    }

    /// Debouncer with an explicit leading flag
    ///
    /// With `leading` set, a call made while nothing is pending also
    /// invokes `func` immediately. The trailing invocation is scheduled
    /// either way.
    pub fn with_leading<F>(delay: Duration, leading: bool, scheduler: Arc<dyn Scheduler>, func: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            leading,
            scheduler,
            func: Arc::new(func),
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    /// Record a call
    ///
    /// Cancels the pending invocation, if any, and schedules a new one with
    /// `arg` after the delay. Returns the new timer.
    ///
    /// Cancelling the returned timer directly through the scheduler does not
    /// clear the pending state: `is_pending` stays true and a leading
    /// debouncer will not lead on its next call. Use `cancel` for that.
    pub fn call(&self, arg: T) -> TimerId {
        let (timer, call_now) = {
            let mut state = self.state.lock();
            let call_now = self.leading && state.pending.is_none();

            if let Some(previous) = state.pending.take() {
                self.scheduler.cancel(previous);
            }
            state.generation += 1;
            let generation = state.generation;

            let task_state = Arc::clone(&self.state);
            let task_func = Arc::clone(&self.func);
            let trailing = arg.clone();
            let timer = self.scheduler.schedule(
                self.delay,
                Box::new(move || {
                    {
                        let mut state = task_state.lock();
                        if state.generation != generation {
                            return;
                        }
                        state.pending = None;
                    }
                    task_func(trailing);
                }),
            );
            state.pending = Some(timer);
            (timer, call_now)
        };

        trace!("Debounce scheduled {:?} in {:?}", timer, self.delay);
        if call_now {
            (self.func)(arg);
        }
        timer
    }

    /// Cancel the pending invocation without running it
    ///
    /// Returns true if something was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        state.generation += 1;
        match state.pending.take() {
            Some(timer) => {
                self.scheduler.cancel(timer);
                trace!("Debounce cancelled {:?}", timer);
                true
            }
            None => false,
        }
    }

    /// Whether an invocation is waiting to run
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// The quiet window
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether leading invocation is enabled
    pub fn is_leading(&self) -> bool {
        self.leading
    }
}
