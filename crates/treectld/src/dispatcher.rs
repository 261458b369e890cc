//! Routes fabric events to controller handlers.
//!
//! The handler table is built once at startup. Dispatch never fails: a
//! handler error is logged and reported as [`EventOutcome::Failed`], so one
//! bad event cannot stop the loop feeding the dispatcher.

use crate::controller::Controller;
use crate::engine::FrameDecision;
use crate::error::{ControllerError, ControllerResult};
use crate::events::{EventKind, FabricEvent};
use sdn_types::SwitchId;
use std::collections::HashMap;
use std::fmt;
use tracing::{error, warn};

/// Signature shared by every event handler.
pub type EventHandler = fn(&Controller, FabricEvent) -> ControllerResult<EventOutcome>;

/// What handling an event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    SwitchConfigured(SwitchId),
    Frame(FrameDecision),
    SwitchPurged { switch: SwitchId, bindings: usize },
    /// Disconnect for a switch with no state.
    Ignored,
    Failed { kind: EventKind, error: String },
}

/// Event-kind to handler table.
pub struct Dispatcher {
    handlers: HashMap<EventKind, EventHandler>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with a handler for every [`EventKind`].
    pub fn new() -> Self {
        let handlers = EventKind::ALL
            .into_iter()
            .map(|kind| (kind, handler_for(kind)))
            .collect();
        Self { handlers }
    }

    /// Hands `event` to its handler.
    pub fn dispatch(&self, controller: &Controller, event: FabricEvent) -> EventOutcome {
        let kind = event.kind();
        let switch = event.switch();

        let Some(handler) = self.handlers.get(&kind) else {
            warn!(%kind, %switch, "no handler registered");
            return EventOutcome::Failed {
                kind,
                error: format!("no handler for {}", kind),
            };
        };

        match handler(controller, event) {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_fatal_for_switch() {
                    warn!(%kind, %switch, error = %e, "switch left unconfigured");
                } else {
                    error!(%kind, %switch, error = %e, "event handling failed");
                }
                EventOutcome::Failed {
                    kind,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn unexpected(expected: EventKind, event: &FabricEvent) -> ControllerError {
    ControllerError::UnexpectedEvent {
        expected,
        actual: event.kind(),
    }
}

fn handler_for(kind: EventKind) -> EventHandler {
    match kind {
        EventKind::SwitchReady => handle_switch_ready,
        EventKind::FrameArrived => handle_frame_arrived,
        EventKind::SwitchDisconnected => handle_switch_disconnected,
    }
}

fn handle_switch_ready(
    controller: &Controller,
    event: FabricEvent,
) -> ControllerResult<EventOutcome> {
    match event {
        FabricEvent::SwitchReady { switch, features } => {
            controller.on_switch_ready(switch, features)?;
            Ok(EventOutcome::SwitchConfigured(switch))
        }
        other => Err(unexpected(EventKind::SwitchReady, &other)),
    }
}

fn handle_frame_arrived(
    controller: &Controller,
    event: FabricEvent,
) -> ControllerResult<EventOutcome> {
    match event {
        FabricEvent::FrameArrived(frame) => {
            controller.on_frame_arrived(&frame).map(EventOutcome::Frame)
        }
        other => Err(unexpected(EventKind::FrameArrived, &other)),
    }
}

fn handle_switch_disconnected(
    controller: &Controller,
    event: FabricEvent,
) -> ControllerResult<EventOutcome> {
    match event {
        FabricEvent::SwitchDisconnected { switch } => {
            Ok(match controller.on_switch_disconnected(switch) {
                Some(bindings) => EventOutcome::SwitchPurged { switch, bindings },
                None => EventOutcome::Ignored,
            })
        }
        other => Err(unexpected(EventKind::SwitchDisconnected, &other)),
    }
}
