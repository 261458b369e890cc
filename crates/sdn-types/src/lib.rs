//! Common types for the fat-tree SDN controller.
//!
//! This crate provides type-safe representations of the primitives the
//! controller reasons about:
//!
//! - [`SwitchId`]: datapath identifier of a connected switch
//! - [`PortNumber`]: a switch-local interface (never zero)
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`PeerType`]: what sits on the far side of a port (host or switch)
//! - [`FrameHeaders`]: the parsed Ethernet header handed to the controller

mod frame;
mod mac;
mod switch;

pub use frame::{EtherType, FrameHeaders, VlanTag};
pub use mac::MacAddress;
pub use switch::{PeerType, PortNumber, SwitchId};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid switch id: {0}")]
    InvalidSwitchId(String),

    #[error("invalid port number: {0}")]
    InvalidPortNumber(u32),

    #[error("invalid peer type: {0}")]
    InvalidPeerType(String),

    #[error("truncated frame: {len} bytes, need at least {needed}")]
    TruncatedFrame { len: usize, needed: usize },
}
