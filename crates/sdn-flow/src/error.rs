//! Fabric error types.

use sdn_types::SwitchId;
use thiserror::Error;

/// Result type alias for fabric operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors raised when handing a command to the switch fabric.
///
/// Commands are fire-and-forget, so these only cover failures to submit,
/// never a missing acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FabricError {
    /// The command channel to the fabric has been closed.
    #[error("fabric channel closed")]
    ChannelClosed,

    /// The fabric refused the command.
    #[error("fabric rejected command for switch {switch}: {reason}")]
    Rejected {
        /// Target switch.
        switch: SwitchId,
        /// Reason reported by the fabric.
        reason: String,
    },
}

impl FabricError {
    /// Creates a rejection error.
    pub fn rejected(switch: SwitchId, reason: impl Into<String>) -> Self {
        FabricError::Rejected {
            switch,
            reason: reason.into(),
        }
    }
}
