//! Announcement Throttle - rate limiting in front of the Narration Port.
//!
//! Time is passed in explicitly (`now` from the session context) so the
//! throttle behaves identically under the tokio clock and the simulated one.
//! Throttle timing is independent of the tracker's per-marker dedup.

use narrator_env::NarrationPort;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Why an announcement request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RefusalReason {
    /// User switched announcements off
    Disabled,
    /// Nothing to say
    EmptyText,
    /// Narration sink reports no availability
    Unavailable,
    /// The minimum interval since the last accepted announcement has not elapsed
    TooSoon { remaining_ms: u64 },
}

/// Result of [`AnnouncementThrottle::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Accepted,
    Refused(RefusalReason),
}

impl ThrottleDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ThrottleDecision::Accepted)
    }

    pub fn refusal(&self) -> Option<RefusalReason> {
        match self {
            ThrottleDecision::Accepted => None,
            ThrottleDecision::Refused(reason) => Some(*reason),
        }
    }
}

/// Gates announcement requests by user toggle, sink availability and
/// minimum spacing, and forwards accepted text to the Narration Port.
pub struct AnnouncementThrottle<N: NarrationPort> {
    port: Arc<N>,
    min_interval: Duration,
    enabled: bool,
    last_accepted_at: Option<Duration>,
}

impl<N: NarrationPort> AnnouncementThrottle<N> {
    /// Creates an enabled throttle.
    pub fn new(port: Arc<N>, min_interval: Duration) -> Self {
        Self {
            port,
            min_interval,
            enabled: true,
            last_accepted_at: None,
        }
    }

    /// Sets the initial toggle state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time of the last accepted announcement.
    pub fn last_accepted_at(&self) -> Option<Duration> {
        self.last_accepted_at
    }

    /// The narration sink behind this throttle.
    pub fn port(&self) -> &Arc<N> {
        &self.port
    }

    /// Applies the user audio toggle.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "Announcements toggled");
        }
        self.enabled = enabled;
    }

    /// Checks every gate except the text, without side effects.
    fn check(&self, now: Duration) -> Result<(), RefusalReason> {
        if !self.enabled {
            return Err(RefusalReason::Disabled);
        }
        if !self.port.is_available() {
            return Err(RefusalReason::Unavailable);
        }
        if let Some(last) = self.last_accepted_at {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                return Err(RefusalReason::TooSoon {
                    remaining_ms: remaining.as_millis() as u64,
                });
            }
        }
        Ok(())
    }

    /// Returns true if a request made at `now` with non-empty text would be accepted.
    pub fn can_announce_now(&self, now: Duration) -> bool {
        self.check(now).is_ok()
    }

    /// Requests an announcement.
    ///
    /// On acceptance any in-flight utterance is cancelled before the new
    /// text is forwarded, and `now` becomes the last-accepted time.
    pub fn request(&mut self, text: &str, now: Duration) -> ThrottleDecision {
        if !self.enabled {
            return ThrottleDecision::Refused(RefusalReason::Disabled);
        }
        if text.trim().is_empty() {
            return ThrottleDecision::Refused(RefusalReason::EmptyText);
        }
        if let Err(reason) = self.check(now) {
            debug!(?reason, "Announcement refused");
            return ThrottleDecision::Refused(reason);
        }

        self.port.cancel();
        self.port.speak(text);
        self.last_accepted_at = Some(now);
        ThrottleDecision::Accepted
    }

    /// Clears the last-accepted time so the next request is not spaced.
    pub fn reset(&mut self) {
        self.last_accepted_at = None;
    }

    /// Stops any in-progress utterance.
    pub fn cancel(&self) {
        self.port.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestPort {
        calls: Mutex<Vec<String>>,
        unavailable: AtomicBool,
    }

    impl NarrationPort for TestPort {
        fn speak(&self, text: &str) {
            self.calls.lock().unwrap().push(format!("speak:{}", text));
        }

        fn cancel(&self) {
            self.calls.lock().unwrap().push("cancel".to_string());
        }

        fn is_available(&self) -> bool {
            !self.unavailable.load(Ordering::SeqCst)
        }
    }

    fn throttle() -> (Arc<TestPort>, AnnouncementThrottle<TestPort>) {
        let port = Arc::new(TestPort::default());
        let throttle = AnnouncementThrottle::new(port.clone(), Duration::from_secs(12));
        (port, throttle)
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_accept_cancels_then_speaks() {
        let (port, mut t) = throttle();
        assert_eq!(t.request("Hello", secs(0)), ThrottleDecision::Accepted);
        assert_eq!(*port.calls.lock().unwrap(), vec!["cancel", "speak:Hello"]);
        assert_eq!(t.last_accepted_at(), Some(secs(0)));
    }

    #[test]
    fn test_min_interval_enforced() {
        let (_, mut t) = throttle();
        assert!(t.request("one", secs(100)).is_accepted());

        let refused = t.request("two", secs(105));
        assert_eq!(
            refused.refusal(),
            Some(RefusalReason::TooSoon { remaining_ms: 7_000 })
        );
        assert!(!t.can_announce_now(secs(111)));
        assert!(t.can_announce_now(secs(112)));
        assert!(t.request("two", secs(112)).is_accepted());
    }

    #[test]
    fn test_disabled_refuses() {
        let (port, mut t) = throttle();
        t.set_enabled(false);
        assert_eq!(t.request("Hello", secs(0)).refusal(), Some(RefusalReason::Disabled));
        assert!(!t.can_announce_now(secs(0)));
        assert!(port.calls.lock().unwrap().is_empty());

        t.set_enabled(true);
        assert!(t.request("Hello", secs(0)).is_accepted());
    }

    #[test]
    fn test_empty_text_refused() {
        let (_, mut t) = throttle();
        assert_eq!(t.request("", secs(0)).refusal(), Some(RefusalReason::EmptyText));
        assert_eq!(t.request("  \n", secs(0)).refusal(), Some(RefusalReason::EmptyText));
        assert_eq!(t.last_accepted_at(), None);
    }

    #[test]
    fn test_unavailable_sink_refused() {
        let (port, mut t) = throttle();
        port.unavailable.store(true, Ordering::SeqCst);
        assert_eq!(t.request("Hello", secs(0)).refusal(), Some(RefusalReason::Unavailable));
        assert!(port.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_spacing() {
        let (_, mut t) = throttle();
        assert!(t.request("one", secs(0)).is_accepted());
        assert!(!t.can_announce_now(secs(1)));
        t.reset();
        assert!(t.can_announce_now(secs(1)));
    }

    #[test]
    fn test_zero_interval_allows_back_to_back() {
        let port = Arc::new(TestPort::default());
        let mut t = AnnouncementThrottle::new(port, Duration::ZERO);
        assert!(t.request("one", secs(3)).is_accepted());
        assert!(t.request("two", secs(3)).is_accepted());
    }

    #[test]
    fn test_clock_going_backwards_is_too_soon() {
        let (_, mut t) = throttle();
        assert!(t.request("one", secs(50)).is_accepted());
        assert!(matches!(
            t.request("two", secs(10)).refusal(),
            Some(RefusalReason::TooSoon { remaining_ms: 12_000 })
        ));
    }
}
