//! Core environment context trait for narration sessions.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" clock and task spawning so that
/// the narration engine can run on a device (tokio) or in the simulation
/// harness with a virtual clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - a manually advanced virtual clock
///
/// # Determinism
///
/// Announcement throttling reads time exclusively through `now()`, so a
/// simulation that controls the clock controls every timing decision.
#[async_trait]
pub trait NarratorContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for throttle windows and duration measurements.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time for event timestamps.
    ///
    /// In simulation, this is derived from virtual clock + epoch offset.
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;

    /// Milliseconds since the Unix epoch according to `system_time()`.
    fn unix_millis(&self) -> u64 {
        self.system_time()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
