//! Duplicate trigger suppression.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use tokio::time::Instant;

/// Hash of the trimmed source text.
pub fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.trim().hash(&mut hasher);
    hasher.finish()
}

/// Suppresses repeated triggers for identical text within a window.
#[derive(Debug, Clone)]
pub struct TriggerGuard {
    window: Duration,
    last: Option<(u64, Instant)>,
}

impl TriggerGuard {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns the content hash if the trigger is admitted, `None` if it
    /// duplicates one admitted less than a window ago.
    pub fn admit(&mut self, text: &str, now: Instant) -> Option<u64> {
        let hash = content_hash(text);
        if let Some((last_hash, at)) = self.last {
            if last_hash == hash && now.duration_since(at) < self.window {
                return None;
            }
        }
        self.last = Some((hash, now));
        Some(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_within_window_suppressed() {
        let start = Instant::now();
        let mut guard = TriggerGuard::new(Duration::from_secs(2));
        assert!(guard.admit("write a poem", start).is_some());
        assert!(guard.admit("write a poem ", start + Duration::from_millis(500)).is_none());
        assert!(guard.admit("write a poem", start + Duration::from_millis(2100)).is_some());
    }

    #[test]
    fn test_different_text_admitted() {
        let start = Instant::now();
        let mut guard = TriggerGuard::new(Duration::from_secs(2));
        assert!(guard.admit("a", start).is_some());
        assert!(guard.admit("b", start).is_some());
        assert!(guard.admit("a", start).is_some());
    }
}
