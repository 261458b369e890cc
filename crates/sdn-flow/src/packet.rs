//! Per-packet output instructions.

use crate::rule::Action;
use sdn_types::{PortNumber, SwitchId};
use serde::{Deserialize, Serialize};

/// How the frame being released is referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketData {
    /// The switch kept the frame; only its buffer id travels back.
    Buffered { buffer_id: u32 },
    /// The switch did not buffer the frame; the controller returns the bytes.
    Unbuffered { data: Vec<u8> },
}

impl PacketData {
    /// Returns the fabric buffer id, if the frame is buffered.
    pub fn buffer_id(&self) -> Option<u32> {
        match self {
            PacketData::Buffered { buffer_id } => Some(*buffer_id),
            PacketData::Unbuffered { .. } => None,
        }
    }

    /// Returns the raw payload the controller must carry, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            PacketData::Buffered { .. } => None,
            PacketData::Unbuffered { data } => Some(data),
        }
    }
}

/// One-shot instruction to emit a single frame now. Nothing is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketOut {
    pub switch: SwitchId,
    pub in_port: PortNumber,
    pub data: PacketData,
    pub actions: Vec<Action>,
}

impl PacketOut {
    pub fn new(switch: SwitchId, in_port: PortNumber, data: PacketData, actions: Vec<Action>) -> Self {
        PacketOut {
            switch,
            in_port,
            data,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_carries_no_payload() {
        let data = PacketData::Buffered { buffer_id: 7 };
        assert_eq!(data.buffer_id(), Some(7));
        assert_eq!(data.payload(), None);
    }

    #[test]
    fn test_unbuffered_carries_payload() {
        let data = PacketData::Unbuffered {
            data: vec![1, 2, 3],
        };
        assert_eq!(data.buffer_id(), None);
        assert_eq!(data.payload(), Some(&[1u8, 2, 3][..]));
    }
}
