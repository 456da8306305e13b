//! Session runtime - the single task that owns a [`NarrationEngine`].
//!
//! Commands, position events and the periodic check tick are serialized
//! through one `select!` loop, so at most one engine update is in flight.
//!
//! ```text
//!   SessionHandle ── mpsc<SessionCommand> ──┐
//!   PositionSource ── recv() ───────────────┼──► session task ──► NarrationPort
//!   ctx.sleep(check_interval) ──────────────┘        │
//!                                                    ├── watch<TrackingStatus>
//!                                                    └── mpsc<AnnouncementEvent>
//! ```
//!
//! A terminated position stream pauses the session in place: commands and
//! ticks are still served until shutdown.

use narrator_env::{NarrationPort, NarratorContext, PositionEvent, PositionSource, SessionId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::engine::{NarrationEngine, TrackingStatus};
use crate::error::CoreError;
use crate::events::AnnouncementEvent;
use crate::model::{Marker, Route};

/// Command queue depth. Commands are rare UI actions.
const COMMAND_CAPACITY: usize = 16;

/// Requests handled by the session task.
#[derive(Debug)]
pub enum SessionCommand {
    ActivateRoute {
        route: Route,
        markers: Vec<Marker>,
        reply: oneshot::Sender<Result<SessionId, CoreError>>,
    },
    ClearRoute,
    SetAnnouncementsEnabled(bool),
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Caller side of a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<TrackingStatus>,
    events: Option<mpsc::UnboundedReceiver<AnnouncementEvent>>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> Result<(), CoreError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::SessionClosed)
    }

    /// Makes `route` the tracked route, starting a fresh session.
    pub async fn activate_route(&self, route: Route, markers: Vec<Marker>) -> Result<SessionId, CoreError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::ActivateRoute {
            route,
            markers,
            reply,
        })
        .await?;
        response.await.map_err(|_| CoreError::SessionClosed)?
    }

    /// Clears the tracked route.
    pub async fn clear_route(&self) -> Result<(), CoreError> {
        self.send(SessionCommand::ClearRoute).await
    }

    /// Applies the user audio toggle.
    pub async fn set_announcements_enabled(&self, enabled: bool) -> Result<(), CoreError> {
        self.send(SessionCommand::SetAnnouncementsEnabled(enabled)).await
    }

    /// Status updates, published after every handled input.
    pub fn status(&self) -> watch::Receiver<TrackingStatus> {
        self.status.clone()
    }

    /// Takes the announcement event stream. Returns `None` after the first call.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<AnnouncementEvent>> {
        self.events.take()
    }

    /// Stops the session, cancelling narration, and waits for the task to end.
    pub async fn shutdown(self) -> Result<(), CoreError> {
        let (done, finished) = oneshot::channel();
        self.send(SessionCommand::Shutdown { done }).await?;
        finished.await.map_err(|_| CoreError::SessionClosed)
    }
}

/// Spawns the session task on the context.
///
/// The configuration is validated up front; on error nothing is spawned.
pub fn spawn_session<Ctx, N, S>(
    context: Arc<Ctx>,
    narrator: Arc<N>,
    source: S,
    config: TrackingConfig,
) -> Result<SessionHandle, CoreError>
where
    Ctx: NarratorContext,
    N: NarrationPort,
    S: PositionSource,
{
    let engine = NarrationEngine::new(context.clone(), narrator, config)?;

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (status_tx, status_rx) = watch::channel(engine.status());
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    context.spawn(
        "narration-session",
        run_session(context.clone(), engine, source, command_rx, status_tx, event_tx),
    );

    Ok(SessionHandle {
        commands: command_tx,
        status: status_rx,
        events: Some(event_rx),
    })
}

async fn run_session<Ctx, N, S>(
    context: Arc<Ctx>,
    mut engine: NarrationEngine<Ctx, N>,
    source: S,
    mut commands: mpsc::Receiver<SessionCommand>,
    status: watch::Sender<TrackingStatus>,
    events: mpsc::UnboundedSender<AnnouncementEvent>,
) where
    Ctx: NarratorContext,
    N: NarrationPort,
    S: PositionSource,
{
    let interval = engine.config().check_interval();
    let mut next_tick = context.now() + interval;
    let mut source_open = true;
    let mut done = None;

    info!(check_interval_ms = interval.as_millis() as u64, "Session loop started");

    loop {
        let until_tick = next_tick.saturating_sub(context.now());

        let update = tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::ActivateRoute { route, markers, reply }) => {
                    let _ = reply.send(engine.activate_route(route, &markers));
                    None
                }
                Some(SessionCommand::ClearRoute) => {
                    engine.clear_route();
                    None
                }
                Some(SessionCommand::SetAnnouncementsEnabled(enabled)) => {
                    engine.set_announcements_enabled(enabled);
                    None
                }
                Some(SessionCommand::Shutdown { done: reply }) => {
                    done = Some(reply);
                    break;
                }
                // Every handle dropped
                None => break,
            },

            event = source.recv(), if source_open => match event {
                Some(PositionEvent::Fix(position)) => Some(engine.on_position(position)),
                Some(PositionEvent::Error { code, message }) => {
                    engine.on_position_error(code, &message);
                    None
                }
                None => {
                    info!("Position stream ended, pausing in place");
                    source_open = false;
                    None
                }
            },

            _ = context.sleep(until_tick) => {
                next_tick = context.now() + interval;
                Some(engine.on_tick())
            }
        };

        if let Some(update) = update {
            for event in update.events {
                // Nobody listening is fine
                let _ = events.send(event);
            }
        }
        status.send_replace(engine.status());
    }

    engine.stop();
    status.send_replace(engine.status());
    debug!("Session loop finished");

    if let Some(done) = done {
        let _ = done.send(());
    }
}
