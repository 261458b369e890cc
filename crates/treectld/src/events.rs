//! Events delivered by the switch fabric.

use sdn_flow::PacketData;
use sdn_types::{FrameHeaders, ParseError, PortNumber, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a [`FabricEvent`], used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SwitchReady,
    FrameArrived,
    SwitchDisconnected,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::SwitchReady,
        EventKind::FrameArrived,
        EventKind::SwitchDisconnected,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::SwitchReady => "switch_ready",
            EventKind::FrameArrived => "frame_arrived",
            EventKind::SwitchDisconnected => "switch_disconnected",
        };
        write!(f, "{}", s)
    }
}

/// What a switch reports about itself when it becomes configurable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchFeatures {
    /// Number of flow tables, if the switch reported it.
    #[serde(default)]
    pub n_tables: Option<u8>,
}

impl SwitchFeatures {
    pub fn with_tables(n_tables: u8) -> Self {
        Self {
            n_tables: Some(n_tables),
        }
    }
}

/// A frame the switch could not classify and sent to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameArrived {
    pub switch: SwitchId,
    pub in_port: PortNumber,
    /// Set when the switch kept the frame.
    #[serde(default)]
    pub buffer_id: Option<u32>,
    /// Leading bytes of the frame; the whole frame when not buffered.
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Headers already decoded at the fabric edge, if any.
    #[serde(default)]
    pub headers: Option<FrameHeaders>,
}

impl FrameArrived {
    /// Builds an event for an unbuffered frame carried as raw bytes.
    pub fn from_raw(switch: SwitchId, in_port: PortNumber, payload: Vec<u8>) -> Self {
        Self {
            switch,
            in_port,
            buffer_id: None,
            payload,
            headers: None,
        }
    }

    /// Builds an event with pre-parsed headers.
    pub fn with_headers(
        switch: SwitchId,
        in_port: PortNumber,
        buffer_id: Option<u32>,
        headers: FrameHeaders,
    ) -> Self {
        Self {
            switch,
            in_port,
            buffer_id,
            payload: Vec::new(),
            headers: Some(headers),
        }
    }

    /// Returns the Ethernet headers, decoding the payload if needed.
    pub fn headers(&self) -> Result<FrameHeaders, ParseError> {
        match self.headers {
            Some(headers) => Ok(headers),
            None => FrameHeaders::parse(&self.payload),
        }
    }

    /// Returns how a packet-out must reference this frame.
    ///
    /// The buffer id wins; raw bytes are only carried for unbuffered frames.
    pub fn packet_data(&self) -> PacketData {
        match self.buffer_id {
            Some(buffer_id) => PacketData::Buffered { buffer_id },
            None => PacketData::Unbuffered {
                data: self.payload.clone(),
            },
        }
    }
}

/// An event from the switch fabric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FabricEvent {
    SwitchReady {
        switch: SwitchId,
        #[serde(default)]
        features: SwitchFeatures,
    },
    FrameArrived(FrameArrived),
    SwitchDisconnected {
        switch: SwitchId,
    },
}

impl FabricEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            FabricEvent::SwitchReady { .. } => EventKind::SwitchReady,
            FabricEvent::FrameArrived(_) => EventKind::FrameArrived,
            FabricEvent::SwitchDisconnected { .. } => EventKind::SwitchDisconnected,
        }
    }

    pub fn switch(&self) -> SwitchId {
        match self {
            FabricEvent::SwitchReady { switch, .. } => *switch,
            FabricEvent::FrameArrived(frame) => frame.switch,
            FabricEvent::SwitchDisconnected { switch } => *switch,
        }
    }
}
