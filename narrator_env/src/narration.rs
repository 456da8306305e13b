//! Narration Port - the boundary to the speech/output sink.
//!
//! The engine only ever needs three capabilities from whatever speaks:
//!
//! ```text
//! Engine                    NarrationPort                 Sink
//!   |                            |                          |
//!   |-- is_available() -------->|                          |
//!   |-- cancel() --------------->|-- stop current -------->|
//!   |-- speak(text) ------------>|-- queue utterance ----->|
//!   |   (returns immediately)    |                          |-- audio...
//! ```
//!
//! `speak` is fire-and-forget: it must never block or be awaited by the
//! caller, so a slow or failing synthesizer cannot stall position handling.

use tokio::sync::mpsc;

/// Abstract speech/output capability.
///
/// Any implementation satisfying these three methods is substitutable
/// (speech synthesizer, audio file player, test recorder, log sink).
pub trait NarrationPort: Send + Sync + 'static {
    /// Starts speaking `text`. Best-effort, returns immediately.
    fn speak(&self, text: &str);

    /// Stops any in-progress utterance immediately.
    fn cancel(&self);

    /// Returns false when no sink exists to speak through.
    fn is_available(&self) -> bool;
}

/// Sink that writes utterances to the log.
///
/// Useful on headless hosts and as a fallback when no synthesizer is
/// installed. Always available.
#[derive(Debug, Default, Clone)]
pub struct LogNarrator;

impl LogNarrator {
    /// Creates a new log sink.
    pub fn new() -> Self {
        Self
    }
}

impl NarrationPort for LogNarrator {
    fn speak(&self, text: &str) {
        tracing::info!(text = %text, "narration");
    }

    fn cancel(&self) {
        tracing::debug!("narration cancelled");
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Command forwarded by [`ChannelNarrator`] to an external synthesis task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationCommand {
    /// Speak the given text
    Speak(String),
    /// Stop the current utterance
    Cancel,
}

/// Sink that forwards utterances over an unbounded channel.
///
/// The receiving side owns the actual synthesizer. Once the receiver is
/// dropped the narrator reports itself unavailable.
#[derive(Debug, Clone)]
pub struct ChannelNarrator {
    tx: mpsc::UnboundedSender<NarrationCommand>,
}

impl ChannelNarrator {
    /// Creates a narrator together with the receiver the synthesizer consumes.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NarrationCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NarrationPort for ChannelNarrator {
    fn speak(&self, text: &str) {
        if self.tx.send(NarrationCommand::Speak(text.to_string())).is_err() {
            tracing::warn!("narration receiver dropped, utterance lost");
        }
    }

    fn cancel(&self) {
        let _ = self.tx.send(NarrationCommand::Cancel);
    }

    fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_narrator_always_available() {
        let narrator = LogNarrator::new();
        narrator.speak("hello");
        narrator.cancel();
        assert!(narrator.is_available());
    }

    #[test]
    fn test_channel_narrator_forwards_commands_in_order() {
        let (narrator, mut rx) = ChannelNarrator::new();
        narrator.cancel();
        narrator.speak("Central market on the left");

        assert_eq!(rx.try_recv().unwrap(), NarrationCommand::Cancel);
        assert_eq!(
            rx.try_recv().unwrap(),
            NarrationCommand::Speak("Central market on the left".to_string())
        );
    }

    #[test]
    fn test_channel_narrator_unavailable_after_receiver_drop() {
        let (narrator, rx) = ChannelNarrator::new();
        assert!(narrator.is_available());

        drop(rx);
        assert!(!narrator.is_available());

        // Must not panic
        narrator.speak("nobody listens");
    }
}
