//! Debounced, rate-limited overlay refresh scheduling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// What caused a layout signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutSignal {
    Mutation,
    Scroll,
    Resize,
}

/// Trailing-edge debounce over layout signals.
///
/// A refresh is due once no signal has arrived for the debounce interval.
/// A due refresh proceeds only if the tracked geometry changed or the
/// minimum interval since the last refresh has passed.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    debounce: Duration,
    min_interval: Duration,
    last_signal: Option<Instant>,
    last_refresh: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(debounce: Duration, min_interval: Duration) -> Self {
        Self {
            debounce,
            min_interval,
            last_signal: None,
            last_refresh: None,
        }
    }

    pub fn signal(&mut self, kind: LayoutSignal, now: Instant) {
        trace!(?kind, "Layout signal");
        self.last_signal = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_signal.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_signal
            .is_some_and(|at| now.duration_since(at) >= self.debounce)
    }

    pub fn allows(&self, now: Instant, geometry_changed: bool) -> bool {
        geometry_changed
            || self
                .last_refresh
                .is_none_or(|at| now.duration_since(at) >= self.min_interval)
    }

    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_signal = None;
        self.last_refresh = Some(now);
    }

    /// Drop a due signal without refreshing.
    pub fn skip(&mut self) {
        self.last_signal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> RefreshScheduler {
        RefreshScheduler::new(Duration::from_millis(100), Duration::from_secs(2))
    }

    #[test]
    fn test_trailing_debounce() {
        let start = Instant::now();
        let mut s = scheduler();
        assert!(!s.is_due(start));

        s.signal(LayoutSignal::Scroll, start);
        s.signal(LayoutSignal::Scroll, start + Duration::from_millis(80));
        assert!(!s.is_due(start + Duration::from_millis(150)));
        assert!(s.is_due(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_min_interval_unless_changed() {
        let start = Instant::now();
        let mut s = scheduler();
        assert!(s.allows(start, false));

        s.mark_refreshed(start);
        assert!(!s.is_pending());
        assert!(!s.allows(start + Duration::from_millis(500), false));
        assert!(s.allows(start + Duration::from_millis(500), true));
        assert!(s.allows(start + Duration::from_secs(2), false));
    }
}
