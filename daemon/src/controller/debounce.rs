//! Leading-edge debounce for the microphone toggle

use std::time::Duration;

use tokio::time::Instant;

/// Accepts the first invocation and drops any others inside the window.
///
/// Dropped invocations are not queued. The window is measured from the last
/// accepted invocation.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Whether an invocation at `now` would be accepted
    pub fn admit(&self, now: Instant) -> bool {
        match self.last_accepted {
            Some(at) => now.saturating_duration_since(at) >= self.window,
            None => true,
        }
    }

    /// Accept an invocation at `now` if the window allows it
    pub fn try_accept(&mut self, now: Instant) -> bool {
        if !self.admit(now) {
            return false;
        }
        self.last_accepted = Some(now);
        true
    }

    /// Forget the last accepted invocation
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_coalesced() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        let accepted = (0..10)
            .map(|i| debouncer.try_accept(start + Duration::from_millis(i * 25)))
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_accepts_after_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        assert!(debouncer.try_accept(start));
        assert!(!debouncer.try_accept(start + Duration::from_millis(299)));
        assert!(debouncer.try_accept(start + Duration::from_millis(300)));
    }

    #[test]
    fn test_dropped_invocations_do_not_extend_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        assert!(debouncer.try_accept(start));
        assert!(!debouncer.try_accept(start + Duration::from_millis(200)));
        assert!(debouncer.try_accept(start + Duration::from_millis(310)));
    }

    #[test]
    fn test_reset() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        assert!(debouncer.try_accept(start));
        assert!(!debouncer.admit(start));
        debouncer.reset();
        assert!(debouncer.try_accept(start + Duration::from_millis(10)));
    }
}
