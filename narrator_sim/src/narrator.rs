//! Recording narration sink for simulation runs.

use narrator_env::NarrationPort;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One call made on the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationRecord {
    Spoken(String),
    Cancelled,
}

/// Narration Port that records every call and can simulate an outage.
#[derive(Debug)]
pub struct RecordingNarrator {
    records: Mutex<Vec<NarrationRecord>>,
    available: AtomicBool,
}

impl Default for RecordingNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingNarrator {
    /// Creates an available narrator with an empty log.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the speech engine going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn push(&self, record: NarrationRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    /// Every call in order.
    pub fn records(&self) -> Vec<NarrationRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Texts passed to `speak`, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                NarrationRecord::Spoken(text) => Some(text),
                NarrationRecord::Cancelled => None,
            })
            .collect()
    }

    /// Number of `cancel` calls.
    pub fn cancel_count(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, NarrationRecord::Cancelled))
            .count()
    }
}

impl NarrationPort for RecordingNarrator {
    fn speak(&self, text: &str) {
        self.push(NarrationRecord::Spoken(text.to_string()));
    }

    fn cancel(&self) {
        self.push(NarrationRecord::Cancelled);
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
