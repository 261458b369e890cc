//! Flow-table programmer.
//!
//! A stateless translator from forwarding decisions to fabric commands.
//! Nothing here waits for the switch to acknowledge anything, and identical
//! adds are not de-duplicated: the switch treats a repeated add with the
//! same match and priority as a replace.

use sdn_flow::{
    Action, FabricResult, FlowMatch, FlowRule, Instruction, PacketData, PacketOut, Priority,
    SwitchFabric, TableId,
};
use sdn_types::{PortNumber, SwitchId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Issues rule adds and packet-outs through a [`SwitchFabric`].
#[derive(Clone)]
pub struct FlowProgrammer {
    fabric: Arc<dyn SwitchFabric>,
}

impl fmt::Debug for FlowProgrammer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowProgrammer").finish_non_exhaustive()
    }
}

impl FlowProgrammer {
    pub fn new(fabric: Arc<dyn SwitchFabric>) -> Self {
        Self { fabric }
    }

    /// Adds a rule to `table` on `switch`.
    pub fn install(
        &self,
        switch: SwitchId,
        table: TableId,
        flow_match: FlowMatch,
        priority: Priority,
        instructions: Vec<Instruction>,
    ) -> FabricResult<()> {
        self.install_rule(
            switch,
            FlowRule::new(table, flow_match, priority, instructions),
        )
    }

    /// Adds a pre-built rule.
    pub fn install_rule(&self, switch: SwitchId, rule: FlowRule) -> FabricResult<()> {
        debug!(
            %switch,
            table = %rule.table,
            priority = %rule.priority,
            in_port = ?rule.flow_match.in_port,
            eth_dst = ?rule.flow_match.eth_dst,
            "install rule"
        );
        self.fabric.send_flow_add(switch, rule)
    }

    /// Adds the priority-0 catch-all rule for `table`.
    pub fn install_default_miss(
        &self,
        switch: SwitchId,
        table: TableId,
        instructions: Vec<Instruction>,
    ) -> FabricResult<()> {
        self.install(
            switch,
            table,
            FlowMatch::any(),
            Priority::TABLE_MISS,
            instructions,
        )
    }

    /// Emits one frame now with `actions`. Nothing is installed.
    pub fn packet_out(
        &self,
        switch: SwitchId,
        in_port: PortNumber,
        data: PacketData,
        actions: Vec<Action>,
    ) -> FabricResult<()> {
        debug!(
            %switch,
            %in_port,
            buffer_id = ?data.buffer_id(),
            n_actions = actions.len(),
            "packet out"
        );
        self.fabric
            .send_packet_out(PacketOut::new(switch, in_port, data, actions))
    }
}
