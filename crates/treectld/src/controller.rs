//! The controller: event handlers tying store, engine and programmer together.

use crate::config::ControllerConfig;
use crate::engine::{FrameDecision, ForwardingEngine};
use crate::error::{ControllerError, ControllerResult};
use crate::events::{FrameArrived, SwitchFeatures};
use crate::pipeline::{self, ForwardingPipeline};
use crate::programmer::FlowProgrammer;
use crate::store::{SwitchPhase, SwitchStateStore};
use crate::topology::NeighborTable;
use sdn_flow::SwitchFabric;
use sdn_types::SwitchId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Running counters, updated lock-free from any handler.
#[derive(Debug, Default)]
pub struct ControllerStats {
    pub switches_configured: AtomicU64,
    pub config_failures: AtomicU64,
    pub frames_received: AtomicU64,
    pub frames_discarded: AtomicU64,
    pub frames_flooded: AtomicU64,
    pub frames_unicast: AtomicU64,
    pub rule_install_failures: AtomicU64,
    pub switches_purged: AtomicU64,
}

/// Point-in-time copy of [`ControllerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub switches_configured: u64,
    pub config_failures: u64,
    pub frames_received: u64,
    pub frames_discarded: u64,
    pub frames_flooded: u64,
    pub frames_unicast: u64,
    pub rule_install_failures: u64,
    pub switches_purged: u64,
}

impl ControllerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            switches_configured: self.switches_configured.load(Ordering::Relaxed),
            config_failures: self.config_failures.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            frames_flooded: self.frames_flooded.load(Ordering::Relaxed),
            frames_unicast: self.frames_unicast.load(Ordering::Relaxed),
            rule_install_failures: self.rule_install_failures.load(Ordering::Relaxed),
            switches_purged: self.switches_purged.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Fat-tree SDN controller.
///
/// All handlers take `&self`; events for different switches may be handled
/// concurrently.
#[derive(Debug)]
pub struct Controller {
    config: ControllerConfig,
    store: SwitchStateStore,
    pipeline: Arc<dyn ForwardingPipeline>,
    engine: ForwardingEngine,
    programmer: FlowProgrammer,
    stats: ControllerStats,
}

impl Controller {
    /// Creates a controller driving `fabric`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: ControllerConfig, fabric: Arc<dyn SwitchFabric>) -> ControllerResult<Self> {
        config.validate()?;

        let pipeline = pipeline::from_config(&config);
        let engine = ForwardingEngine::new(
            Arc::clone(&pipeline),
            NeighborTable::from_config(&config),
        );

        Ok(Self {
            config,
            store: SwitchStateStore::new(),
            pipeline,
            engine,
            programmer: FlowProgrammer::new(fabric),
            stats: ControllerStats::default(),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn store(&self) -> &SwitchStateStore {
        &self.store
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Programs a newly connected switch with its baseline rules.
    ///
    /// Any earlier state for the switch is discarded. If the switch lacks
    /// the tables the pipeline needs, or a rule add is refused, the switch
    /// is left in [`SwitchPhase::ConfigFailed`] until its next switch-ready.
    #[instrument(skip(self), fields(mode = %self.config.mode))]
    pub fn on_switch_ready(
        &self,
        switch: SwitchId,
        features: SwitchFeatures,
    ) -> ControllerResult<()> {
        self.store.begin_configuring(switch);

        if !self.pipeline.supports(&features) {
            return Err(self.fail_configuration(
                switch,
                format!(
                    "switch reports {} tables, {} required",
                    features.n_tables.unwrap_or_default(),
                    self.pipeline.required_tables()
                ),
            ));
        }

        if let Err(e) = self.pipeline.program_baseline(switch, &self.programmer) {
            return Err(self.fail_configuration(switch, e.to_string()));
        }

        self.store.set_phase(switch, SwitchPhase::Active);
        bump(&self.stats.switches_configured);
        info!(%switch, "switch configured");
        Ok(())
    }

    fn fail_configuration(&self, switch: SwitchId, reason: String) -> ControllerError {
        self.store.set_phase(switch, SwitchPhase::ConfigFailed);
        bump(&self.stats.config_failures);
        ControllerError::configuration_failed(switch, reason)
    }

    /// Learns from `frame`, caches a forwarding rule if the destination is
    /// known, and releases the frame.
    ///
    /// A refused rule add is logged and otherwise ignored: the table-miss
    /// path keeps the destination reachable by flooding.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Fabric`] only if the packet-out could not
    /// be handed to the fabric.
    #[instrument(skip(self, frame), fields(switch = %frame.switch, in_port = %frame.in_port))]
    pub fn on_frame_arrived(&self, frame: &FrameArrived) -> ControllerResult<FrameDecision> {
        bump(&self.stats.frames_received);

        let decision = self.engine.decide(&self.store, frame);
        match &decision {
            FrameDecision::Discarded(reason) => {
                debug!(%reason, "frame discarded");
                bump(&self.stats.frames_discarded);
                return Ok(decision);
            }
            FrameDecision::Flooded { .. } => {
                bump(&self.stats.frames_flooded);
            }
            FrameDecision::Unicast { port, rule, .. } => {
                bump(&self.stats.frames_unicast);
                if let Err(source) = self.programmer.install_rule(frame.switch, rule.clone()) {
                    bump(&self.stats.rule_install_failures);
                    let err = ControllerError::RuleInstall {
                        switch: frame.switch,
                        table: rule.table,
                        source,
                    };
                    warn!(error = %err, out_port = %port, "forward rule not installed");
                }
            }
        }

        let actions = decision.actions().map(<[_]>::to_vec).unwrap_or_default();
        self.programmer
            .packet_out(frame.switch, frame.in_port, frame.packet_data(), actions)?;
        Ok(decision)
    }

    /// Drops everything known about `switch`. Returns the number of
    /// bindings discarded, or `None` if the switch had no state.
    #[instrument(skip(self))]
    pub fn on_switch_disconnected(&self, switch: SwitchId) -> Option<usize> {
        let purged = self.store.purge(switch);
        match purged {
            Some(bindings) => {
                bump(&self.stats.switches_purged);
                info!(%switch, bindings, "switch disconnected, state purged");
            }
            None => debug!(%switch, "disconnect for unknown switch"),
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sdn_flow::{RecordingFabric, TableId};
    use sdn_types::{EtherType, FrameHeaders, MacAddress, PortNumber};

    const AA: MacAddress = MacAddress::new([0, 0, 0, 0, 0, 0xaa]);
    const BB: MacAddress = MacAddress::new([0, 0, 0, 0, 0, 0xbb]);

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    fn setup() -> (Arc<RecordingFabric>, Controller) {
        let fabric = Arc::new(RecordingFabric::new());
        let controller = Controller::new(ControllerConfig::default(), fabric.clone()).unwrap();
        (fabric, controller)
    }

    fn frame(in_port: u32, src: MacAddress, dst: MacAddress) -> FrameArrived {
        FrameArrived::with_headers(
            SwitchId::new(1),
            port(in_port),
            None,
            FrameHeaders::new(src, dst, EtherType::IPV4),
        )
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ControllerConfig::default();
        config.branch_factor = 3;
        let result = Controller::new(config, Arc::new(RecordingFabric::new()));
        assert!(matches!(result, Err(ControllerError::InvalidConfig { .. })));
    }

    #[test]
    fn test_switch_ready_activates() {
        let (fabric, controller) = setup();
        let s1 = SwitchId::new(1);

        controller.on_switch_ready(s1, SwitchFeatures::default()).unwrap();
        assert_eq!(controller.store().phase(s1), Some(SwitchPhase::Active));
        assert_eq!(fabric.flow_adds(s1).len(), 5);
        assert_eq!(controller.stats().snapshot().switches_configured, 1);
    }

    #[test]
    fn test_too_few_tables_fails_configuration() {
        let (fabric, controller) = setup();
        let s1 = SwitchId::new(1);

        let err = controller
            .on_switch_ready(s1, SwitchFeatures::with_tables(1))
            .unwrap_err();
        assert!(err.is_fatal_for_switch());
        assert_eq!(controller.store().phase(s1), Some(SwitchPhase::ConfigFailed));
        assert!(fabric.is_empty());
    }

    #[test]
    fn test_rule_install_failure_still_releases_frame() {
        let (fabric, controller) = setup();
        let s1 = SwitchId::new(1);
        controller.on_switch_ready(s1, SwitchFeatures::default()).unwrap();

        controller.on_frame_arrived(&frame(2, AA, BB)).unwrap();
        fabric.reject_flow_adds(s1);
        let decision = controller.on_frame_arrived(&frame(5, BB, AA)).unwrap();

        assert!(matches!(decision, FrameDecision::Unicast { .. }));
        assert_eq!(fabric.flow_adds_in(s1, TableId::Forward).len(), 1);
        assert_eq!(fabric.packet_outs(s1).len(), 2);
        assert_eq!(controller.stats().snapshot().rule_install_failures, 1);
    }

    #[test]
    fn test_discarded_frame_emits_nothing() {
        let (fabric, controller) = setup();
        let runt = FrameArrived::from_raw(SwitchId::new(1), port(1), vec![0; 4]);

        let decision = controller.on_frame_arrived(&runt).unwrap();
        assert!(decision.is_discarded());
        assert!(fabric.is_empty());
        assert_eq!(controller.stats().snapshot().frames_discarded, 1);
    }

    #[test]
    fn test_disconnect_purges() {
        let (_fabric, controller) = setup();
        let s1 = SwitchId::new(1);
        controller.on_switch_ready(s1, SwitchFeatures::default()).unwrap();
        controller.on_frame_arrived(&frame(2, AA, BB)).unwrap();

        assert_eq!(controller.on_switch_disconnected(s1), Some(1));
        assert_eq!(controller.on_switch_disconnected(s1), None);
        assert_eq!(controller.store().phase(s1), None);
    }
}
