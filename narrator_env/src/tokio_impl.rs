//! Tokio-backed context for live narration sessions.
//!
//! `spawn_session` runs its loop on this context, and every throttle window
//! and tick deadline is measured against its clock.

use crate::NarratorContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Context for a rider's device.
///
/// Announcement spacing reads `now()`, which counts from construction on
/// `tokio::time::Instant`. A runtime with paused time therefore moves the
/// spacing window and the re-evaluation tick together.
pub struct TokioContext {
    /// Origin of the announcement clock
    start: Instant,
}

impl TokioContext {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Shared between the engine and the session task that drives it.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NarratorContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let task = name.to_string();
        tokio::spawn(async move {
            tracing::debug!(task = %task, "Narration task started");
            future.await;
            tracing::debug!(task = %task, "Narration task finished");
        });
    }

    fn seed(&self) -> u64 {
        // Unseeded: session ids are random v4
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_announcement_clock_advances_with_sleep() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_window_follows_paused_clock() {
        let ctx = TokioContext::new();
        ctx.sleep(Duration::from_secs(30)).await;

        assert!(ctx.now() >= Duration::from_secs(30));
        assert!(ctx.now() < Duration::from_secs(31));
    }

    #[test]
    fn test_unseeded_context_gives_distinct_session_ids() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
        assert_ne!(crate::SessionId::new(), crate::SessionId::new());
    }

    #[test]
    fn test_unix_millis_is_after_2020() {
        let ctx = TokioContext::new();
        assert!(ctx.unix_millis() > 1_577_836_800_000);
    }
}
