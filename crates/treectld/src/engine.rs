//! Forwarding decisions for frames punted to the controller.

use crate::events::FrameArrived;
use crate::pipeline::ForwardingPipeline;
use crate::store::SwitchStateStore;
use crate::topology::NeighborTable;
use sdn_flow::{Action, FlowRule};
use sdn_types::PortNumber;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Why a frame was dropped without any command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Source and destination could not be extracted, or the source is a
    /// group address.
    Malformed,
    /// Link-layer discovery traffic between switches.
    ControlFrame,
    /// The switch failed baseline programming.
    SwitchNotConfigured,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscardReason::Malformed => "malformed",
            DiscardReason::ControlFrame => "control_frame",
            DiscardReason::SwitchNotConfigured => "switch_not_configured",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of [`ForwardingEngine::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameDecision {
    Discarded(DiscardReason),
    /// Destination unknown; the frame is flooded and no rule is installed.
    Flooded { actions: Vec<Action> },
    /// Destination known; `rule` caches the decision on the switch.
    Unicast {
        port: PortNumber,
        rule: FlowRule,
        actions: Vec<Action>,
    },
}

impl FrameDecision {
    /// Actions for the immediate packet-out, if one is due.
    pub fn actions(&self) -> Option<&[Action]> {
        match self {
            FrameDecision::Discarded(_) => None,
            FrameDecision::Flooded { actions } | FrameDecision::Unicast { actions, .. } => {
                Some(actions)
            }
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, FrameDecision::Discarded(_))
    }
}

/// Learns source addresses and picks flood or unicast for each frame.
#[derive(Debug, Clone)]
pub struct ForwardingEngine {
    pipeline: Arc<dyn ForwardingPipeline>,
    neighbors: NeighborTable,
}

impl ForwardingEngine {
    pub fn new(pipeline: Arc<dyn ForwardingPipeline>, neighbors: NeighborTable) -> Self {
        Self {
            pipeline,
            neighbors,
        }
    }

    /// Decides what to do with `frame`, learning its source on the way.
    ///
    /// Malformed and discovery frames are rejected before the store is
    /// touched. Learning the source and looking up the destination happen
    /// under one lock of the switch's state.
    pub fn decide(&self, store: &SwitchStateStore, frame: &FrameArrived) -> FrameDecision {
        let headers = match frame.headers() {
            Ok(headers) => headers,
            Err(e) => {
                debug!(
                    switch = %frame.switch,
                    in_port = %frame.in_port,
                    error = %e,
                    "discarding malformed frame"
                );
                return FrameDecision::Discarded(DiscardReason::Malformed);
            }
        };

        if headers.is_control_frame() {
            trace!(switch = %frame.switch, in_port = %frame.in_port, "ignoring discovery frame");
            return FrameDecision::Discarded(DiscardReason::ControlFrame);
        }

        // A group address is never a station, so it must not be learned.
        if headers.src.is_multicast() {
            debug!(
                switch = %frame.switch,
                in_port = %frame.in_port,
                src = %headers.src,
                "discarding frame with group source address"
            );
            return FrameDecision::Discarded(DiscardReason::Malformed);
        }

        let dest = store.with_switch(frame.switch, |state| {
            if !state.phase.accepts_frames() {
                return None;
            }
            if let Some(old) = state.learn(headers.src, frame.in_port) {
                debug!(
                    switch = %frame.switch,
                    mac = %headers.src,
                    from = %old,
                    to = %frame.in_port,
                    "address moved"
                );
            }
            Some(state.lookup(&headers.dst))
        });

        let Some(dest) = dest else {
            debug!(switch = %frame.switch, "dropping frame for unconfigured switch");
            return FrameDecision::Discarded(DiscardReason::SwitchNotConfigured);
        };

        match dest {
            None => FrameDecision::Flooded {
                actions: self.pipeline.flood_actions(frame.in_port),
            },
            Some(port) => {
                let mut actions = Vec::with_capacity(2);
                if headers.vlan_present() && self.neighbors.peer_type(frame.switch, port).is_host() {
                    actions.push(Action::PopVlan);
                }
                actions.push(Action::output(port));

                let rule = self
                    .pipeline
                    .forward_rule(frame.in_port, headers.dst, actions.clone());
                FrameDecision::Unicast {
                    port,
                    rule,
                    actions,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ControllerConfig, ForwardingMode};
    use crate::pipeline;
    use crate::store::SwitchPhase;
    use pretty_assertions::assert_eq;
    use sdn_flow::{FlowMatch, TableId};
    use sdn_types::{EtherType, FrameHeaders, MacAddress, SwitchId};

    const AA: MacAddress = MacAddress::new([0, 0, 0, 0, 0, 0xaa]);
    const BB: MacAddress = MacAddress::new([0, 0, 0, 0, 0, 0xbb]);

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    fn engine(config: &ControllerConfig) -> ForwardingEngine {
        ForwardingEngine::new(
            pipeline::from_config(config),
            NeighborTable::from_config(config),
        )
    }

    fn frame(switch: u64, in_port: u32, src: MacAddress, dst: MacAddress) -> FrameArrived {
        FrameArrived::with_headers(
            SwitchId::new(switch),
            port(in_port),
            Some(1),
            FrameHeaders::new(src, dst, EtherType::IPV4),
        )
    }

    #[test]
    fn test_flood_before_learn() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());

        let decision = engine.decide(&store, &frame(1, 2, AA, BB));
        assert_eq!(
            decision,
            FrameDecision::Flooded {
                actions: vec![
                    Action::output(port(4)),
                    Action::output(port(5)),
                    Action::output(port(6))
                ]
            }
        );
        assert_eq!(store.lookup(SwitchId::new(1), &AA), Some(port(2)));
    }

    #[test]
    fn test_unicast_after_learn() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());

        engine.decide(&store, &frame(1, 2, AA, BB));
        let decision = engine.decide(&store, &frame(1, 5, BB, AA));

        let FrameDecision::Unicast {
            port: out,
            rule,
            actions,
        } = decision
        else {
            panic!("expected unicast, got {:?}", decision);
        };
        assert_eq!(out, port(2));
        assert_eq!(actions, vec![Action::output(port(2))]);
        assert_eq!(rule.table, TableId::Forward);
        assert_eq!(rule.flow_match, FlowMatch::any().with_eth_dst(AA));
        assert_eq!(rule.output_ports(), vec![port(2)]);
    }

    #[test]
    fn test_control_frame_is_ignored() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());
        let lldp = FrameArrived::with_headers(
            SwitchId::new(1),
            port(1),
            None,
            FrameHeaders::new(AA, BB, EtherType::LLDP),
        );

        assert_eq!(
            engine.decide(&store, &lldp),
            FrameDecision::Discarded(DiscardReason::ControlFrame)
        );
        assert_eq!(store.switch_count(), 0);
    }

    #[test]
    fn test_malformed_frame_is_discarded() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());
        let runt = FrameArrived::from_raw(SwitchId::new(1), port(1), vec![0xff; 8]);

        let decision = engine.decide(&store, &runt);
        assert_eq!(decision, FrameDecision::Discarded(DiscardReason::Malformed));
        assert!(decision.actions().is_none());
        assert_eq!(store.switch_count(), 0);
    }

    #[test]
    fn test_group_source_is_not_learned() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());
        let multicast = MacAddress::new([0x01, 0x00, 0x5e, 0, 0, 1]);

        for src in [MacAddress::BROADCAST, multicast] {
            assert_eq!(
                engine.decide(&store, &frame(1, 2, src, BB)),
                FrameDecision::Discarded(DiscardReason::Malformed)
            );
        }
        assert_eq!(store.switch_count(), 0);

        // A broadcast destination is still flooded.
        assert!(matches!(
            engine.decide(&store, &frame(1, 2, AA, MacAddress::BROADCAST)),
            FrameDecision::Flooded { .. }
        ));
        assert_eq!(store.lookup(SwitchId::new(1), &MacAddress::BROADCAST), None);
    }

    #[test]
    fn test_config_failed_switch_drops_frames() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());
        let s1 = SwitchId::new(1);
        store.begin_configuring(s1);
        store.set_phase(s1, SwitchPhase::ConfigFailed);

        assert_eq!(
            engine.decide(&store, &frame(1, 2, AA, BB)),
            FrameDecision::Discarded(DiscardReason::SwitchNotConfigured)
        );
        assert_eq!(store.binding_count(s1), 0);
    }

    #[test]
    fn test_host_facing_tagged_frame_pops_vlan() {
        let mut config = ControllerConfig::default();
        config.edge_switches = vec![SwitchId::new(1)];
        let store = SwitchStateStore::new();
        let engine = engine(&config);

        store.learn(SwitchId::new(1), AA, port(5));
        let tagged = FrameArrived::with_headers(
            SwitchId::new(1),
            port(1),
            None,
            FrameHeaders::new(BB, AA, EtherType::IPV4).with_vlan(10),
        );

        let decision = engine.decide(&store, &tagged);
        assert_eq!(
            decision.actions(),
            Some(&[Action::PopVlan, Action::output(port(5))][..])
        );
    }

    #[test]
    fn test_switch_facing_tagged_frame_keeps_vlan() {
        let store = SwitchStateStore::new();
        let engine = engine(&ControllerConfig::default());

        store.learn(SwitchId::new(1), AA, port(5));
        let tagged = FrameArrived::with_headers(
            SwitchId::new(1),
            port(1),
            None,
            FrameHeaders::new(BB, AA, EtherType::IPV4).with_vlan(10),
        );

        assert_eq!(
            engine.decide(&store, &tagged).actions(),
            Some(&[Action::output(port(5))][..])
        );
    }

    #[test]
    fn test_learning_mode_decisions() {
        let mut config = ControllerConfig::default();
        config.mode = ForwardingMode::Learning;
        let store = SwitchStateStore::new();
        let engine = engine(&config);

        assert_eq!(
            engine.decide(&store, &frame(1, 2, AA, BB)).actions(),
            Some(&[Action::flood()][..])
        );
        let FrameDecision::Unicast { rule, .. } = engine.decide(&store, &frame(1, 5, BB, AA))
        else {
            panic!("expected unicast");
        };
        assert_eq!(
            rule.flow_match,
            FlowMatch::any().with_in_port(port(5)).with_eth_dst(AA)
        );
    }
}
