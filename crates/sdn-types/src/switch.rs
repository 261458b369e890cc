//! Switch and port identity types.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Datapath identifier of a connected switch.
///
/// Stable for the lifetime of one connection; all per-switch controller state
/// is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchId(u64);

impl SwitchId {
    /// Creates a switch id from a raw datapath id.
    pub const fn new(dpid: u64) -> Self {
        SwitchId(dpid)
    }

    /// Returns the raw datapath id.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SwitchId {
    type Err = ParseError;

    /// Accepts decimal (`"17"`) or `0x`-prefixed hexadecimal (`"0x11"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(SwitchId)
            .map_err(|_| ParseError::InvalidSwitchId(s.to_string()))
    }
}

impl From<u64> for SwitchId {
    fn from(dpid: u64) -> Self {
        SwitchId(dpid)
    }
}

/// A physical switch port.
///
/// Port numbers start at 1. Reserved logical ports (flood, controller) are
/// not port numbers and are modelled as output targets instead.
///
/// # Examples
///
/// ```
/// use sdn_types::PortNumber;
///
/// let port = PortNumber::new(4).unwrap();
/// assert_eq!(port.get(), 4);
/// assert!(PortNumber::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PortNumber(NonZeroU32);

impl PortNumber {
    /// Highest number usable by a physical port (OpenFlow `OFPP_MAX`).
    pub const MAX: u32 = 0xffff_ff00;

    /// Creates a port number, rejecting 0 and reserved values.
    pub const fn new(port: u32) -> Result<Self, ParseError> {
        if port > Self::MAX {
            return Err(ParseError::InvalidPortNumber(port));
        }
        match NonZeroU32::new(port) {
            Some(n) => Ok(PortNumber(n)),
            None => Err(ParseError::InvalidPortNumber(port)),
        }
    }

    /// Returns the port number as a u32.
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for PortNumber {
    type Error = ParseError;

    fn try_from(port: u32) -> Result<Self, Self::Error> {
        PortNumber::new(port)
    }
}

impl From<PortNumber> for u32 {
    fn from(port: PortNumber) -> u32 {
        port.get()
    }
}

/// What is attached to the far end of a switch port.
///
/// Drives VLAN tag stripping: frames leaving toward a host lose their tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerType {
    /// An end host.
    Host,
    /// Another switch in the fabric (default for unlisted ports).
    #[default]
    Switch,
}

impl PeerType {
    /// Returns true if the peer is an end host.
    pub const fn is_host(&self) -> bool {
        matches!(self, PeerType::Host)
    }
}

impl fmt::Display for PeerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerType::Host => write!(f, "host"),
            PeerType::Switch => write!(f, "switch"),
        }
    }
}

impl FromStr for PeerType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" => Ok(PeerType::Host),
            "switch" => Ok(PeerType::Switch),
            _ => Err(ParseError::InvalidPeerType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_switch_id_parse() {
        assert_eq!("17".parse::<SwitchId>().unwrap(), SwitchId::new(17));
        assert_eq!("0x11".parse::<SwitchId>().unwrap(), SwitchId::new(17));
        assert!("s1".parse::<SwitchId>().is_err());
    }

    #[test]
    fn test_switch_id_display() {
        assert_eq!(SwitchId::new(1).to_string(), "0000000000000001");
    }

    #[test]
    fn test_port_number_range() {
        assert!(PortNumber::new(0).is_err());
        assert_eq!(PortNumber::new(1).unwrap().get(), 1);
        assert!(PortNumber::new(PortNumber::MAX).is_ok());
        assert_eq!(
            PortNumber::new(0xffff_fffd),
            Err(ParseError::InvalidPortNumber(0xffff_fffd))
        );
    }

    #[test]
    fn test_port_number_serde() {
        let port: PortNumber = serde_json::from_str("5").unwrap();
        assert_eq!(port.get(), 5);
        assert!(serde_json::from_str::<PortNumber>("0").is_err());
    }

    #[test]
    fn test_peer_type() {
        assert_eq!("HOST".parse::<PeerType>().unwrap(), PeerType::Host);
        assert!("router".parse::<PeerType>().is_err());
        assert_eq!(PeerType::default(), PeerType::Switch);
        assert!(PeerType::Host.is_host());
    }
}
