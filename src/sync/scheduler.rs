//! Auto-refresh scheduler
//!
//! Owns the single timer task that drives periodic refreshes. Starting again
//! replaces the previous task, and dropping the scheduler aborts it, so there
//! is never more than one interval alive per orchestrator.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Future returned by a tick callback; resolves to `false` to end the task
pub type TickFuture = Pin<Box<dyn Future<Output = bool> + Send>>;

type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

/// Period and enable flag for auto-refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub interval: Duration,
    pub enabled: bool,
}

impl RefreshPolicy {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self { interval, enabled }
    }

    /// A zero period never fires
    pub fn is_active(&self) -> bool {
        self.enabled && !self.interval.is_zero()
    }

    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }
}

struct SchedulerState {
    policy: RefreshPolicy,
    tick: Option<TickFn>,
    handle: Option<JoinHandle<()>>,
}

pub struct RefreshScheduler {
    state: Mutex<SchedulerState>,
}

impl RefreshScheduler {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                policy,
                tick: None,
                handle: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.lock().policy
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Start ticking with `tick`, replacing any running timer
    ///
    /// The first tick fires one full period after the call. Does nothing
    /// beyond remembering `tick` while the policy is inactive.
    pub fn start<F>(&self, tick: F)
    where
        F: Fn() -> TickFuture + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.tick = Some(Arc::new(tick));
        Self::spawn(&mut state);
    }

    /// Apply a new policy, rebuilding the timer if one was started
    pub fn reschedule(&self, policy: RefreshPolicy) {
        let mut state = self.lock();
        if state.policy == policy {
            return;
        }
        state.policy = policy;
        Self::spawn(&mut state);
    }

    /// Abort the timer task
    pub fn stop(&self) {
        let mut state = self.lock();
        state.tick = None;
        if let Some(handle) = state.handle.take() {
            handle.abort();
            tracing::info!("Auto-refresh stopped");
        }
    }

    fn spawn(state: &mut SchedulerState) {
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }

        let tick = match state.tick.as_ref() {
            Some(tick) if state.policy.is_active() => Arc::clone(tick),
            _ => return,
        };
        let period = state.policy.interval;

        tracing::info!(interval_ms = state.policy.interval_ms(), "Auto-refresh started");

        state.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !tick().await {
                    break;
                }
            }
        }));
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().handle.take() {
            handle.abort();
        }
    }
}
