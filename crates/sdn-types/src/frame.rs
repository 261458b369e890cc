//! Parsed Ethernet headers.
//!
//! The fabric edge turns raw frame bytes into a [`FrameHeaders`] value; the
//! controller core only ever sees that value.

use crate::{MacAddress, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An Ethernet II ether type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EtherType(pub u16);

impl EtherType {
    pub const IPV4: EtherType = EtherType(0x0800);
    pub const ARP: EtherType = EtherType(0x0806);
    pub const VLAN: EtherType = EtherType(0x8100);
    pub const IPV6: EtherType = EtherType(0x86dd);
    pub const QINQ: EtherType = EtherType(0x88a8);
    pub const LLDP: EtherType = EtherType(0x88cc);

    /// Returns true for 802.1Q / 802.1ad tag protocol identifiers.
    pub const fn is_vlan_tpid(&self) -> bool {
        self.0 == Self::VLAN.0 || self.0 == Self::QINQ.0
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Outermost 802.1Q tag of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VlanTag {
    /// Priority code point (3 bits).
    pub pcp: u8,
    /// VLAN identifier (12 bits). Zero means priority-tagged only.
    pub vid: u16,
}

impl VlanTag {
    fn from_tci(tci: u16) -> Self {
        VlanTag {
            pcp: (tci >> 13) as u8,
            vid: tci & 0x0fff,
        }
    }
}

/// The header fields the controller needs from an arriving frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeaders {
    pub src: MacAddress,
    pub dst: MacAddress,
    /// Ether type of the payload, after any VLAN tags.
    pub ether_type: EtherType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanTag>,
}

const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

impl FrameHeaders {
    /// Creates untagged headers.
    pub fn new(src: MacAddress, dst: MacAddress, ether_type: EtherType) -> Self {
        FrameHeaders {
            src,
            dst,
            ether_type,
            vlan: None,
        }
    }

    /// Attaches an outer VLAN tag.
    pub fn with_vlan(mut self, vid: u16) -> Self {
        self.vlan = Some(VlanTag { pcp: 0, vid });
        self
    }

    /// Parses the Ethernet header (and up to two VLAN tags) from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::TruncatedFrame`] if the buffer ends inside a header.
    pub fn parse(frame: &[u8]) -> Result<Self, ParseError> {
        let truncated = |needed: usize| ParseError::TruncatedFrame {
            len: frame.len(),
            needed,
        };

        if frame.len() < ETH_HEADER_LEN {
            return Err(truncated(ETH_HEADER_LEN));
        }
        let dst = MacAddress::from_slice(&frame[0..6]).ok_or_else(|| truncated(6))?;
        let src = MacAddress::from_slice(&frame[6..12]).ok_or_else(|| truncated(12))?;

        let mut offset = 12;
        let mut ether_type = read_u16(frame, offset).ok_or_else(|| truncated(offset + 2))?;
        let mut vlan = None;

        // Outer tag is reported, a second (QinQ) tag is skipped.
        for _ in 0..2 {
            if !ether_type.is_vlan_tpid() {
                break;
            }
            let needed = offset + 2 + VLAN_TAG_LEN;
            let tci = read_u16(frame, offset + 2).ok_or_else(|| truncated(needed))?;
            ether_type = read_u16(frame, offset + 4).ok_or_else(|| truncated(needed))?;
            if vlan.is_none() {
                vlan = Some(VlanTag::from_tci(tci.0));
            }
            offset += VLAN_TAG_LEN;
        }

        Ok(FrameHeaders {
            src,
            dst,
            ether_type,
            vlan,
        })
    }

    /// Returns true for link-layer discovery traffic exchanged between switches.
    pub fn is_control_frame(&self) -> bool {
        self.ether_type == EtherType::LLDP
    }

    /// Returns true if the frame carries an 802.1Q tag.
    pub fn vlan_present(&self) -> bool {
        self.vlan.is_some()
    }
}

fn read_u16(frame: &[u8], at: usize) -> Option<EtherType> {
    let bytes = frame.get(at..at + 2)?;
    Some(EtherType(u16::from_be_bytes([bytes[0], bytes[1]])))
}
