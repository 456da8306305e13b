//! Route Narrator Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" boundary that lets the narration
//! engine run against a real device (tokio, speech synthesis, geolocation)
//! or inside the deterministic simulation harness.
//!
//! # Core Concept: Everything at the edge is injected
//!
//! The engine never touches ambient globals. All I/O is intercepted:
//! - Time (`now()`, `sleep()`)
//! - Narration output (`speak()`, `cancel()`, `is_available()`)
//! - Position input (`recv()` on a position source)
//!
//! # Example
//!
//! ```ignore
//! use narrator_env::{NarratorContext, PositionSource};
//!
//! async fn session_loop<Ctx: NarratorContext, Src: PositionSource>(
//!     ctx: &Ctx,
//!     source: &Src,
//! ) {
//!     loop {
//!         tokio::select! {
//!             event = source.recv() => handle_position(event),
//!             _ = ctx.sleep(Duration::from_millis(1000)) => tick(),
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod narration;
mod position;
mod tokio_impl;
mod types;

pub use context::NarratorContext;
pub use error::EnvError;
pub use narration::{ChannelNarrator, LogNarrator, NarrationCommand, NarrationPort};
pub use position::{position_channel, ChannelPositionSource, PositionSender, PositionSource};
pub use tokio_impl::TokioContext;
pub use types::{Coordinate, Position, PositionEvent, SessionId};
