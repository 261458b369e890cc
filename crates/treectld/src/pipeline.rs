//! Table pipelines a switch can be programmed with.
//!
//! A pipeline owns the static layout decisions: which baseline rules a
//! freshly connected switch gets, what a flood looks like, and where a
//! learned forwarding rule lives.

use crate::config::{ControllerConfig, ForwardingMode};
use crate::events::SwitchFeatures;
use crate::flood::FloodPlanner;
use crate::programmer::FlowProgrammer;
use sdn_flow::{Action, FabricResult, FlowMatch, FlowRule, Instruction, Priority, TableId};
use sdn_types::{MacAddress, PortNumber, SwitchId};
use std::fmt;
use std::sync::Arc;

/// Table layout and flooding policy for one [`ForwardingMode`].
pub trait ForwardingPipeline: Send + Sync + fmt::Debug {
    /// Number of tables the switch must support.
    fn required_tables(&self) -> u8;

    /// Installs the rules every switch needs before it forwards anything.
    fn program_baseline(&self, switch: SwitchId, programmer: &FlowProgrammer) -> FabricResult<()>;

    /// Packet-out actions that flood a frame arriving on `in_port`.
    ///
    /// Must never output to the controller.
    fn flood_actions(&self, in_port: PortNumber) -> Vec<Action>;

    /// Rule caching a unicast decision for `dst`.
    fn forward_rule(&self, in_port: PortNumber, dst: MacAddress, actions: Vec<Action>) -> FlowRule;

    /// Returns true if `features` are sufficient for this pipeline.
    fn supports(&self, features: &SwitchFeatures) -> bool {
        features
            .n_tables
            .map_or(true, |n| n >= self.required_tables())
    }
}

/// Builds the pipeline selected in `config`.
pub fn from_config(config: &ControllerConfig) -> Arc<dyn ForwardingPipeline> {
    match config.mode {
        ForwardingMode::Tree => Arc::new(TreePipeline::new(
            FloodPlanner::new(config.branch_factor)
                .with_punt_to_controller(config.punt_to_controller),
        )),
        ForwardingMode::Learning => Arc::new(LearningPipeline),
    }
}

/// Two-table pipeline: exact-destination Forward table backed by the
/// storm-safe Flood table.
#[derive(Debug, Clone, Copy)]
pub struct TreePipeline {
    planner: FloodPlanner,
}

impl TreePipeline {
    pub fn new(planner: FloodPlanner) -> Self {
        Self { planner }
    }

    pub fn planner(&self) -> &FloodPlanner {
        &self.planner
    }
}

impl ForwardingPipeline for TreePipeline {
    fn required_tables(&self) -> u8 {
        2
    }

    fn program_baseline(&self, switch: SwitchId, programmer: &FlowProgrammer) -> FabricResult<()> {
        programmer.install_default_miss(
            switch,
            TableId::Forward,
            vec![Instruction::goto(TableId::Flood)],
        )?;
        for rule in self.planner.flood_rules() {
            programmer.install_rule(switch, rule)?;
        }
        Ok(())
    }

    fn flood_actions(&self, in_port: PortNumber) -> Vec<Action> {
        self.planner.flood_actions(in_port)
    }

    fn forward_rule(&self, _in_port: PortNumber, dst: MacAddress, actions: Vec<Action>) -> FlowRule {
        FlowRule::new(
            TableId::Forward,
            FlowMatch::any().with_eth_dst(dst),
            Priority::FORWARD,
            vec![Instruction::apply(actions)],
        )
    }
}

/// Single-table learning switch: misses go to the controller and floods
/// use the native flood port.
#[derive(Debug, Clone, Copy, Default)]
pub struct LearningPipeline;

impl ForwardingPipeline for LearningPipeline {
    fn required_tables(&self) -> u8 {
        1
    }

    fn program_baseline(&self, switch: SwitchId, programmer: &FlowProgrammer) -> FabricResult<()> {
        programmer.install_default_miss(
            switch,
            TableId::Forward,
            vec![Instruction::apply(vec![Action::controller()])],
        )
    }

    fn flood_actions(&self, _in_port: PortNumber) -> Vec<Action> {
        vec![Action::flood()]
    }

    fn forward_rule(&self, in_port: PortNumber, dst: MacAddress, actions: Vec<Action>) -> FlowRule {
        FlowRule::new(
            TableId::Forward,
            FlowMatch::any().with_in_port(in_port).with_eth_dst(dst),
            Priority::FORWARD,
            vec![Instruction::apply(actions)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sdn_flow::RecordingFabric;

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    #[test]
    fn test_tree_baseline() {
        let fabric = Arc::new(RecordingFabric::new());
        let programmer = FlowProgrammer::new(fabric.clone());
        let s1 = SwitchId::new(1);

        TreePipeline::new(FloodPlanner::new(6))
            .program_baseline(s1, &programmer)
            .unwrap();

        let forward = fabric.flow_adds_in(s1, TableId::Forward);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].goto_table(), Some(TableId::Flood));
        assert_eq!(fabric.flow_adds_in(s1, TableId::Flood).len(), 4);
    }

    #[test]
    fn test_learning_baseline() {
        let fabric = Arc::new(RecordingFabric::new());
        let programmer = FlowProgrammer::new(fabric.clone());
        let s1 = SwitchId::new(1);

        LearningPipeline.program_baseline(s1, &programmer).unwrap();

        let rules = fabric.flow_adds(s1);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].table, TableId::Forward);
        assert_eq!(rules[0].priority, Priority::TABLE_MISS);
        assert_eq!(
            rules[0].actions().copied().collect::<Vec<_>>(),
            vec![Action::controller()]
        );
    }

    #[test]
    fn test_forward_rule_matches() {
        let dst = MacAddress::new([0, 0, 0, 0, 0, 0xaa]);
        let actions = vec![Action::output(port(2))];

        let tree =
            TreePipeline::new(FloodPlanner::new(6)).forward_rule(port(5), dst, actions.clone());
        assert_eq!(tree.flow_match, FlowMatch::any().with_eth_dst(dst));
        assert_eq!(tree.priority, Priority::FORWARD);

        let learning = LearningPipeline.forward_rule(port(5), dst, actions);
        assert_eq!(
            learning.flow_match,
            FlowMatch::any().with_in_port(port(5)).with_eth_dst(dst)
        );
    }

    #[test]
    fn test_supports() {
        let tree = TreePipeline::new(FloodPlanner::new(6));
        assert!(tree.supports(&SwitchFeatures::default()));
        assert!(tree.supports(&SwitchFeatures::with_tables(2)));
        assert!(!tree.supports(&SwitchFeatures::with_tables(1)));
        assert!(LearningPipeline.supports(&SwitchFeatures::with_tables(1)));
    }

    #[test]
    fn test_from_config() {
        let mut config = ControllerConfig::default();
        assert_eq!(from_config(&config).required_tables(), 2);
        config.mode = ForwardingMode::Learning;
        assert_eq!(from_config(&config).required_tables(), 1);
    }
}
