//! Flow rule building blocks: matches, actions and instructions.

use crate::table::{Priority, TableId};
use sdn_types::{MacAddress, PortNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an output action sends a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPort {
    /// A specific switch port.
    Physical(PortNumber),
    /// Every port except the one the frame arrived on.
    Flood,
    /// Punt to the controller as a frame-arrived event.
    Controller,
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputPort::Physical(port) => write!(f, "{}", port),
            OutputPort::Flood => write!(f, "FLOOD"),
            OutputPort::Controller => write!(f, "CONTROLLER"),
        }
    }
}

/// A single packet action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Strip the outermost 802.1Q tag.
    PopVlan,
    /// Emit the frame.
    Output { port: OutputPort },
}

impl Action {
    /// Output to a physical port.
    pub const fn output(port: PortNumber) -> Self {
        Action::Output {
            port: OutputPort::Physical(port),
        }
    }

    /// Native flood (all ports except ingress).
    pub const fn flood() -> Self {
        Action::Output {
            port: OutputPort::Flood,
        }
    }

    /// Punt to the controller.
    pub const fn controller() -> Self {
        Action::Output {
            port: OutputPort::Controller,
        }
    }
}

/// What a rule does once it matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    /// Apply the actions immediately, in order.
    ApplyActions { actions: Vec<Action> },
    /// Continue matching in another table.
    GotoTable { table: TableId },
}

impl Instruction {
    /// Shorthand for [`Instruction::ApplyActions`].
    pub fn apply(actions: Vec<Action>) -> Self {
        Instruction::ApplyActions { actions }
    }

    /// Shorthand for [`Instruction::GotoTable`].
    pub const fn goto(table: TableId) -> Self {
        Instruction::GotoTable { table }
    }
}

/// Match predicate of a flow rule. Unset fields are wildcards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_port: Option<PortNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_dst: Option<MacAddress>,
}

impl FlowMatch {
    /// Matches every frame.
    pub const fn any() -> Self {
        FlowMatch {
            in_port: None,
            eth_dst: None,
        }
    }

    pub fn with_in_port(mut self, port: PortNumber) -> Self {
        self.in_port = Some(port);
        self
    }

    pub fn with_eth_dst(mut self, mac: MacAddress) -> Self {
        self.eth_dst = Some(mac);
        self
    }

    /// Returns true if this predicate has no constraints.
    pub fn is_wildcard(&self) -> bool {
        self.in_port.is_none() && self.eth_dst.is_none()
    }
}

/// A persistent rule installed in one table of one switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRule {
    pub table: TableId,
    #[serde(rename = "match")]
    pub flow_match: FlowMatch,
    pub priority: Priority,
    pub instructions: Vec<Instruction>,
}

impl FlowRule {
    pub fn new(
        table: TableId,
        flow_match: FlowMatch,
        priority: Priority,
        instructions: Vec<Instruction>,
    ) -> Self {
        FlowRule {
            table,
            flow_match,
            priority,
            instructions,
        }
    }

    /// Iterates over every action applied by this rule.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.instructions.iter().flat_map(|inst| match inst {
            Instruction::ApplyActions { actions } => actions.as_slice(),
            Instruction::GotoTable { .. } => &[][..],
        })
    }

    /// Physical ports this rule outputs to, in action order.
    pub fn output_ports(&self) -> Vec<PortNumber> {
        self.actions()
            .filter_map(|action| match action {
                Action::Output {
                    port: OutputPort::Physical(port),
                } => Some(*port),
                _ => None,
            })
            .collect()
    }

    /// Returns true if this rule natively floods.
    pub fn floods(&self) -> bool {
        self.actions().any(|action| {
            matches!(
                action,
                Action::Output {
                    port: OutputPort::Flood
                }
            )
        })
    }

    /// Table this rule continues to, if it carries a goto instruction.
    pub fn goto_table(&self) -> Option<TableId> {
        self.instructions.iter().find_map(|inst| match inst {
            Instruction::GotoTable { table } => Some(*table),
            Instruction::ApplyActions { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    #[test]
    fn test_wildcard_match() {
        assert!(FlowMatch::any().is_wildcard());
        assert!(!FlowMatch::any().with_in_port(port(1)).is_wildcard());
        assert!(!FlowMatch::any()
            .with_eth_dst(MacAddress::new([0, 0, 0, 0, 0, 0xbb]))
            .is_wildcard());
    }

    #[test]
    fn test_rule_inspection() {
        let rule = FlowRule::new(
            TableId::Flood,
            FlowMatch::any().with_in_port(port(1)),
            Priority::TABLE_MISS,
            vec![Instruction::apply(vec![
                Action::output(port(4)),
                Action::output(port(5)),
                Action::controller(),
            ])],
        );
        assert_eq!(rule.output_ports(), vec![port(4), port(5)]);
        assert!(!rule.floods());
        assert_eq!(rule.goto_table(), None);

        let miss = FlowRule::new(
            TableId::Forward,
            FlowMatch::any(),
            Priority::TABLE_MISS,
            vec![Instruction::goto(TableId::Flood)],
        );
        assert_eq!(miss.goto_table(), Some(TableId::Flood));
        assert_eq!(miss.actions().count(), 0);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = FlowRule::new(
            TableId::Forward,
            FlowMatch::any().with_eth_dst(MacAddress::new([0, 0, 0, 0, 0, 0xaa])),
            Priority::FORWARD,
            vec![Instruction::apply(vec![Action::PopVlan, Action::output(port(2))])],
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["table"], "forward");
        assert_eq!(json["match"]["eth_dst"], "00:00:00:00:00:aa");
        assert_eq!(json["priority"], 1);
        assert_eq!(json["instructions"][0]["type"], "apply_actions");
        assert_eq!(json["instructions"][0]["actions"][0]["type"], "pop_vlan");
        assert_eq!(json["instructions"][0]["actions"][1]["port"]["physical"], 2);
    }
}
