//! Retry policy for failed resolutions.
//!
//! A page without a target is retried on every mutation for a short window.
//! After that the resolver goes quiet until a mutation adds or removes nodes.

use std::time::Duration;

use tokio::time::Instant;

/// Summary of a host mutation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationSignal {
    pub added: usize,
    pub removed: usize,
    pub attributes: usize,
}

impl MutationSignal {
    pub fn added(count: usize) -> Self {
        Self {
            added: count,
            ..Default::default()
        }
    }

    pub fn attributes(count: usize) -> Self {
        Self {
            attributes: count,
            ..Default::default()
        }
    }

    /// Structural changes can introduce a new input; attribute churn cannot.
    pub fn is_relevant(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Retrying { since: Instant },
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct ResolutionRetry {
    give_up: Duration,
    state: RetryState,
}

impl ResolutionRetry {
    pub fn new(give_up: Duration) -> Self {
        Self {
            give_up,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn record_success(&mut self) {
        self.state = RetryState::Idle;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.state = match self.state {
            RetryState::Idle => RetryState::Retrying { since: now },
            RetryState::Retrying { since } if now.duration_since(since) >= self.give_up => {
                RetryState::Abandoned
            }
            other => other,
        };
    }

    /// Whether a mutation should trigger another resolution attempt.
    pub fn should_attempt(&mut self, signal: &MutationSignal, now: Instant) -> bool {
        if let RetryState::Retrying { since } = self.state {
            if now.duration_since(since) >= self.give_up {
                self.state = RetryState::Abandoned;
            }
        }

        match self.state {
            RetryState::Idle | RetryState::Retrying { .. } => true,
            RetryState::Abandoned if signal.is_relevant() => {
                self.state = RetryState::Retrying { since: now };
                true
            }
            RetryState::Abandoned => false,
        }
    }
}
