//! The switch fabric interface.
//!
//! Every command is fire-and-forget: a successful return only means the
//! command was handed off, never that the switch applied it.

use crate::error::{FabricError, FabricResult};
use crate::packet::PacketOut;
use crate::rule::FlowRule;
use crate::table::TableId;
use parking_lot::Mutex;
use sdn_types::SwitchId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::trace;

/// Sink for commands the controller issues to switches.
///
/// Implementations must not block on network I/O.
pub trait SwitchFabric: Send + Sync {
    /// Adds a flow rule to one of the switch's tables.
    fn send_flow_add(&self, switch: SwitchId, rule: FlowRule) -> FabricResult<()>;

    /// Emits a single frame.
    fn send_packet_out(&self, packet: PacketOut) -> FabricResult<()>;
}

/// A command as it leaves the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FabricCommand {
    FlowAdd { switch: SwitchId, rule: FlowRule },
    PacketOut(PacketOut),
}

impl FabricCommand {
    /// Returns the switch the command targets.
    pub fn switch(&self) -> SwitchId {
        match self {
            FabricCommand::FlowAdd { switch, .. } => *switch,
            FabricCommand::PacketOut(packet) => packet.switch,
        }
    }
}

/// Fabric that forwards commands over an unbounded tokio channel.
///
/// The receiving half is drained by whatever speaks the wire protocol.
#[derive(Debug, Clone)]
pub struct ChannelFabric {
    tx: mpsc::UnboundedSender<FabricCommand>,
}

impl ChannelFabric {
    /// Creates the fabric and the receiver its commands arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FabricCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn submit(&self, command: FabricCommand) -> FabricResult<()> {
        self.tx
            .send(command)
            .map_err(|_| FabricError::ChannelClosed)
    }
}

impl SwitchFabric for ChannelFabric {
    fn send_flow_add(&self, switch: SwitchId, rule: FlowRule) -> FabricResult<()> {
        trace!(%switch, table = %rule.table, priority = %rule.priority, "queue flow add");
        self.submit(FabricCommand::FlowAdd { switch, rule })
    }

    fn send_packet_out(&self, packet: PacketOut) -> FabricResult<()> {
        trace!(switch = %packet.switch, in_port = %packet.in_port, "queue packet out");
        self.submit(FabricCommand::PacketOut(packet))
    }
}

/// In-memory fabric that records every accepted command.
///
/// Flow adds can be rejected per switch to exercise install failures.
#[derive(Debug, Default)]
pub struct RecordingFabric {
    commands: Mutex<Vec<FabricCommand>>,
    rejecting: Mutex<HashSet<SwitchId>>,
}

impl RecordingFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent flow add for `switch` fail.
    pub fn reject_flow_adds(&self, switch: SwitchId) {
        self.rejecting.lock().insert(switch);
    }

    /// Stops rejecting flow adds for `switch`.
    pub fn accept_flow_adds(&self, switch: SwitchId) {
        self.rejecting.lock().remove(&switch);
    }

    /// Returns a snapshot of all accepted commands in issue order.
    pub fn commands(&self) -> Vec<FabricCommand> {
        self.commands.lock().clone()
    }

    /// Returns the flow rules accepted for `switch`.
    pub fn flow_adds(&self, switch: SwitchId) -> Vec<FlowRule> {
        self.commands
            .lock()
            .iter()
            .filter_map(|cmd| match cmd {
                FabricCommand::FlowAdd { switch: s, rule } if *s == switch => Some(rule.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the flow rules accepted for one table of `switch`.
    pub fn flow_adds_in(&self, switch: SwitchId, table: TableId) -> Vec<FlowRule> {
        self.flow_adds(switch)
            .into_iter()
            .filter(|rule| rule.table == table)
            .collect()
    }

    /// Returns the packet-outs accepted for `switch`.
    pub fn packet_outs(&self, switch: SwitchId) -> Vec<PacketOut> {
        self.commands
            .lock()
            .iter()
            .filter_map(|cmd| match cmd {
                FabricCommand::PacketOut(packet) if packet.switch == switch => Some(packet.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets all recorded commands.
    pub fn clear(&self) {
        self.commands.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }
}

impl SwitchFabric for RecordingFabric {
    fn send_flow_add(&self, switch: SwitchId, rule: FlowRule) -> FabricResult<()> {
        if self.rejecting.lock().contains(&switch) {
            return Err(FabricError::rejected(switch, "flow add rejected"));
        }
        self.commands
            .lock()
            .push(FabricCommand::FlowAdd { switch, rule });
        Ok(())
    }

    fn send_packet_out(&self, packet: PacketOut) -> FabricResult<()> {
        self.commands.lock().push(FabricCommand::PacketOut(packet));
        Ok(())
    }
}
