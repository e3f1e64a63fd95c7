//! Capped exponential backoff and the single-timer reconnect scheduler

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::ReconnectConfig;

/// Backoff state: `delay = min(base * 2^attempt, max)`
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Delay for a given attempt without touching the counter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Compute the next delay and advance the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl From<&ReconnectConfig> for Backoff {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(config.base_delay(), config.max_delay())
    }
}

/// A retry timer that has been armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRetry {
    pub ticket: u64,
    pub attempt: u32,
    pub delay: Duration,
}

struct PendingRetry {
    ticket: u64,
    task: JoinHandle<()>,
}

/// Owns at most one pending retry timer.
///
/// The timer is a spawned task that sleeps for the backoff delay and then calls
/// the fire callback with its ticket. The callback must confirm the ticket with
/// [`ReconnectScheduler::take_fired`] before acting, so a timer that woke up
/// right as it was cancelled does nothing.
pub struct ReconnectScheduler {
    backoff: Backoff,
    pending: Option<PendingRetry>,
    next_ticket: u64,
}

impl ReconnectScheduler {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            backoff: Backoff::from(config),
            pending: None,
            next_ticket: 0,
        }
    }

    /// Arm the retry timer unless one is already pending
    pub fn schedule<F>(&mut self, runtime: &Handle, fire: F) -> Option<ScheduledRetry>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        if self.pending.is_some() {
            return None;
        }

        let attempt = self.backoff.attempt();
        let delay = self.backoff.next_delay();
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire(ticket);
        });

        self.pending = Some(PendingRetry { ticket, task });

        Some(ScheduledRetry {
            ticket,
            attempt,
            delay,
        })
    }

    /// Clear the pending timer if `ticket` is still the current one
    pub fn take_fired(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Back to the base delay after a successful open
    pub fn reset(&mut self) {
        self.backoff.reset();
    }

    pub fn attempt(&self) -> u32 {
        self.backoff.attempt()
    }
}

impl Drop for ReconnectScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
