//! Route Narrator Deterministic Simulation Harness
//!
//! Runs the real `NarrationEngine` against a scripted rider so whole rides
//! can be replayed bit-for-bit from a single 64-bit seed.
//!
//! # Core Principle
//!
//! All sources of non-determinism are controlled:
//! - **Time**: `SimContext` is a virtual clock advanced in 100 ms steps
//! - **Position**: `RouteWalker` derives GPS noise from a seeded ChaCha8 RNG
//! - **Speech**: `RecordingNarrator` records utterances instead of playing them
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                         │
//! │  ┌──────────────┐  fix / tick   ┌──────────────────────┐    │
//! │  │ RouteWalker  │──────────────►│   NarrationEngine    │    │
//! │  │ (noise,      │               │  (SimContext clock)  │    │
//! │  │  dropouts)   │               └──────────┬───────────┘    │
//! │  └──────────────┘                          │                │
//! │                         ┌──────────────────┼─────────┐      │
//! │                         ▼                  ▼         ▼      │
//! │               RecordingNarrator   InvariantMonitor  SimExport│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use narrator_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::FullRide);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
pub mod fixtures;
mod invariants;
mod narrator;
mod runner;
pub mod scenarios;
mod walker;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{SimExport, SimFrame};
pub use invariants::InvariantMonitor;
pub use narrator::{NarrationRecord, RecordingNarrator};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use walker::{Detour, RouteWalker};
