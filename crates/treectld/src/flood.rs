//! Storm-safe flood planning for fat-tree switches.
//!
//! Ports of a switch with branch factor `k` split into a downstream half
//! `[1, k/2]` and an upstream half `[k/2+1, k]`. A frame arriving on a
//! downstream port is flooded only to the upstream half; a frame arriving
//! anywhere else uses the switch's native flood. Because the tiers of a
//! multi-rooted tree are strictly layered, a frame flooded up is never
//! flooded back down into the subtree it came from, so no spanning tree
//! is needed.

use sdn_flow::{Action, FlowMatch, FlowRule, Instruction, Priority, TableId};
use sdn_types::PortNumber;

/// Per-switch flood plan derived from the branch factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodPlanner {
    branch_factor: u32,
    punt_to_controller: bool,
}

impl FloodPlanner {
    /// Creates a planner for an even branch factor `k >= 2`.
    ///
    /// The caller validates `k`; see [`crate::ControllerConfig::validate`].
    pub fn new(branch_factor: u32) -> Self {
        Self {
            branch_factor,
            punt_to_controller: false,
        }
    }

    /// Also copies every flooded frame to the controller.
    pub fn with_punt_to_controller(mut self, punt: bool) -> Self {
        self.punt_to_controller = punt;
        self
    }

    pub fn branch_factor(&self) -> u32 {
        self.branch_factor
    }

    fn half(&self) -> u32 {
        self.branch_factor / 2
    }

    /// Ports `[1, k/2]`.
    pub fn downstream_ports(&self) -> impl Iterator<Item = PortNumber> {
        ports(1, self.half())
    }

    /// Ports `[k/2+1, k]`.
    pub fn upstream_ports(&self) -> impl Iterator<Item = PortNumber> {
        ports(self.half() + 1, self.branch_factor)
    }

    pub fn is_downstream(&self, port: PortNumber) -> bool {
        port.get() <= self.half()
    }

    /// Actions for a packet-out of a frame flooded after arriving on
    /// `in_port`.
    ///
    /// Never includes the controller output, even when punting is on.
    pub fn flood_actions(&self, in_port: PortNumber) -> Vec<Action> {
        if self.is_downstream(in_port) {
            self.upstream_ports().map(Action::output).collect()
        } else {
            vec![Action::flood()]
        }
    }

    /// Actions installed in the Flood-table rule that `in_port` hits.
    fn flood_rule_actions(&self, in_port: PortNumber) -> Vec<Action> {
        let mut actions = self.flood_actions(in_port);
        if self.punt_to_controller {
            actions.push(Action::controller());
        }
        actions
    }

    /// Static Flood-table rules: one `in_port` rule per downstream port,
    /// followed by the unqualified default flood rule.
    ///
    /// All rules share priority 0. The `in_port` rules are strictly more
    /// specific than the default, so a frame never matches two of them.
    pub fn flood_rules(&self) -> Vec<FlowRule> {
        let mut rules: Vec<FlowRule> = self
            .downstream_ports()
            .map(|in_port| {
                FlowRule::new(
                    TableId::Flood,
                    FlowMatch::any().with_in_port(in_port),
                    Priority::TABLE_MISS,
                    vec![Instruction::apply(self.flood_rule_actions(in_port))],
                )
            })
            .collect();
        rules.push(self.default_flood_rule());
        rules
    }

    /// The Flood-table catch-all: native flood for upstream arrivals.
    pub fn default_flood_rule(&self) -> FlowRule {
        let mut actions = vec![Action::flood()];
        if self.punt_to_controller {
            actions.push(Action::controller());
        }
        FlowRule::new(
            TableId::Flood,
            FlowMatch::any(),
            Priority::TABLE_MISS,
            vec![Instruction::apply(actions)],
        )
    }
}

fn ports(first: u32, last: u32) -> impl Iterator<Item = PortNumber> {
    (first..=last).filter_map(|n| PortNumber::new(n).ok())
}
