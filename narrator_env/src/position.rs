//! Position source abstraction for narration sessions.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::EnvError;
use crate::types::{Position, PositionEvent};

/// Subscription-style source of position updates.
///
/// # Implementations
///
/// - **Production**: a device geolocation watcher feeding a channel
/// - **Simulation**: the route walker pushing synthetic fixes
///
/// # Event Flow
///
/// ```text
/// Device                  PositionSource               Session loop
///   |                          |                            |
///   |-- fix / error ---------->|                            |
///   |                          |-- recv() -> Some(event) -->|
///   |   (watch cleared)        |                            |
///   |                          |-- recv() -> None --------->|  (pause in place)
/// ```
#[async_trait]
pub trait PositionSource: Send + Sync + 'static {
    /// Receives the next event.
    ///
    /// # Returns
    /// * `Some(event)` - A fix or a device error
    /// * `None` - The stream terminated permanently
    async fn recv(&self) -> Option<PositionEvent>;
}

/// Channel-backed position source.
pub struct ChannelPositionSource {
    /// Receiver for incoming events (behind tokio mutex for async)
    rx: Arc<Mutex<mpsc::Receiver<PositionEvent>>>,
}

impl ChannelPositionSource {
    /// Wraps an existing receiver.
    pub fn new(rx: mpsc::Receiver<PositionEvent>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }
}

#[async_trait]
impl PositionSource for ChannelPositionSource {
    async fn recv(&self) -> Option<PositionEvent> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// Producer half handed to whatever watches the device position.
#[derive(Debug, Clone)]
pub struct PositionSender {
    tx: mpsc::Sender<PositionEvent>,
}

impl PositionSender {
    /// Publishes a fix.
    pub async fn send_fix(&self, position: Position) -> Result<(), EnvError> {
        self.tx
            .send(PositionEvent::Fix(position))
            .await
            .map_err(|_| EnvError::PositionSourceClosed)
    }

    /// Publishes a device error.
    pub async fn send_error(&self, code: u16, message: impl Into<String>) -> Result<(), EnvError> {
        self.tx
            .send(PositionEvent::Error {
                code,
                message: message.into(),
            })
            .await
            .map_err(|_| EnvError::PositionSourceClosed)
    }

    /// Publishes a fix without waiting; drops it when the buffer is full.
    ///
    /// Returns false if the fix was not queued.
    pub fn try_send_fix(&self, position: Position) -> bool {
        self.tx.try_send(PositionEvent::Fix(position)).is_ok()
    }
}

/// Creates a bounded position channel.
pub fn position_channel(capacity: usize) -> (PositionSender, ChannelPositionSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (PositionSender { tx }, ChannelPositionSource::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    #[tokio::test]
    async fn test_channel_source_yields_events_in_order() {
        let (tx, source) = position_channel(8);
        let fix = Position::new(Coordinate::new(48.1724, 27.3030), 1);

        tx.send_fix(fix).await.unwrap();
        tx.send_error(3, "timeout").await.unwrap();

        assert_eq!(source.recv().await, Some(PositionEvent::Fix(fix)));
        assert_eq!(
            source.recv().await,
            Some(PositionEvent::Error {
                code: 3,
                message: "timeout".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_channel_source_ends_when_sender_dropped() {
        let (tx, source) = position_channel(1);
        drop(tx);
        assert_eq!(source.recv().await, None);
    }

    #[tokio::test]
    async fn test_sender_errors_after_source_dropped() {
        let (tx, source) = position_channel(1);
        drop(source);

        let fix = Position::new(Coordinate::new(0.0, 0.0), 0);
        assert!(matches!(
            tx.send_fix(fix).await,
            Err(EnvError::PositionSourceClosed)
        ));
        assert!(!tx.try_send_fix(fix));
    }
}
