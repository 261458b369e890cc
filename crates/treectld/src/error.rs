//! Error types for the controller.

use crate::events::EventKind;
use sdn_flow::{FabricError, TableId};
use sdn_types::SwitchId;
use std::io;
use thiserror::Error;

/// Result type alias for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors that can occur while configuring or driving switches.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A rule add was refused while the switch was already forwarding.
    #[error("failed to install {table} rule on switch {switch}: {source}")]
    RuleInstall {
        switch: SwitchId,
        table: TableId,
        #[source]
        source: FabricError,
    },

    /// Baseline programming failed; the switch stays unconfigured.
    #[error("switch {switch} could not be configured: {reason}")]
    ConfigurationFailed { switch: SwitchId, reason: String },

    /// The fabric itself is gone.
    #[error("fabric error: {0}")]
    Fabric(#[from] FabricError),

    /// Invalid controller configuration.
    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// An event was routed to a handler for a different event kind.
    #[error("handler for {expected} received a {actual} event")]
    UnexpectedEvent { expected: EventKind, actual: EventKind },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ControllerError {
    /// Creates a configuration failure error.
    pub fn configuration_failed(switch: SwitchId, reason: impl Into<String>) -> Self {
        Self::ConfigurationFailed {
            switch,
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error keeps the switch from reaching the active state.
    ///
    /// Everything else degrades to flooding and leaves the switch usable.
    pub fn is_fatal_for_switch(&self) -> bool {
        matches!(self, ControllerError::ConfigurationFailed { .. })
    }
}
