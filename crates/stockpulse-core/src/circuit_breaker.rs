//! Provider circuit breaker.
//!
//! Every upstream call holds a [`CallPermit`] and settles it with a
//! [`CallOutcome`]. After `failure_threshold` consecutive failures the circuit
//! opens and rejects calls locally for `cool_down`. The first call after the
//! cool-down is the only one let through; its outcome decides the next state:
//!
//! | trial outcome | next state |
//! |---------------|------------|
//! | `Answered`    | closed     |
//! | `Throttled`   | open, cool-down restarted, failure count kept |
//! | `Failed`      | open, cool-down restarted |
//!
//! A permit dropped without being settled counts as `Failed`; this is how a
//! call cancelled by a caller-side timeout is accounted for.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::RemoteError;

/// Runtime circuit state for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// How the provider handled one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The provider answered, including "unknown symbol" and empty answers.
    Answered,
    /// The provider answered with a throttling notice.
    Throttled,
    /// Transport, status, decoding or timeout failure.
    Failed,
}

#[derive(Debug)]
struct Ledger {
    state: CircuitState,
    consecutive_failures: u32,
    retry_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Breaker shared by every endpoint of one provider client.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cool_down: Duration,
    ledger: Mutex<Ledger>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(30))
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cool_down: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cool_down,
            ledger: Mutex::new(Ledger {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                retry_at: None,
                trial_in_flight: false,
            }),
        }
    }

    // Every update leaves the ledger consistent, so a poisoned lock is usable.
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit one call, or reject it with [`RemoteError::CircuitOpen`].
    pub fn permit(&self) -> Result<CallPermit<'_>, RemoteError> {
        let mut ledger = self.ledger();
        match ledger.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::HalfOpen if ledger.trial_in_flight => Err(RemoteError::CircuitOpen),
            CircuitState::HalfOpen => {
                ledger.trial_in_flight = true;
                Ok(CallPermit::new(self, true))
            }
            CircuitState::Open => {
                let cooled = ledger.retry_at.is_some_and(|at| Instant::now() >= at);
                if !cooled {
                    return Err(RemoteError::CircuitOpen);
                }
                tracing::debug!("circuit half-open; letting one trial call through");
                ledger.state = CircuitState::HalfOpen;
                ledger.trial_in_flight = true;
                Ok(CallPermit::new(self, true))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.ledger().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.ledger().consecutive_failures
    }

    fn settle(&self, trial: bool, outcome: CallOutcome) {
        let mut ledger = self.ledger();
        if trial {
            ledger.trial_in_flight = false;
        }

        match outcome {
            CallOutcome::Answered => {
                if ledger.state != CircuitState::Closed {
                    tracing::info!("provider answered; circuit closed");
                }
                ledger.state = CircuitState::Closed;
                ledger.consecutive_failures = 0;
                ledger.retry_at = None;
            }
            CallOutcome::Throttled if trial => {
                tracing::debug!("trial throttled; circuit stays open");
                ledger.state = CircuitState::Open;
                ledger.retry_at = Some(Instant::now() + self.cool_down);
            }
            CallOutcome::Throttled => {}
            CallOutcome::Failed => {
                ledger.consecutive_failures = ledger.consecutive_failures.saturating_add(1);
                if trial || ledger.consecutive_failures >= self.failure_threshold {
                    if ledger.state != CircuitState::Open {
                        tracing::warn!(
                            failures = ledger.consecutive_failures,
                            cool_down_secs = self.cool_down.as_secs(),
                            "circuit opened"
                        );
                    }
                    ledger.state = CircuitState::Open;
                    ledger.retry_at = Some(Instant::now() + self.cool_down);
                }
            }
        }
    }

    fn release(&self, trial: bool) {
        if trial {
            let mut ledger = self.ledger();
            ledger.trial_in_flight = false;
        }
    }
}

/// Admission for one upstream call.
#[must_use = "settle the permit with the call's outcome"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn settle(mut self, outcome: CallOutcome) {
        self.settled = true;
        self.breaker.settle(self.trial, outcome);
    }

    /// Give the permit back unused, e.g. when the local request budget
    /// rejects the call before it is sent.
    pub fn release(mut self) {
        self.settled = true;
        self.breaker.release(self.trial);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.trial, CallOutcome::Failed);
        }
    }
}
