//! Static neighbor table: what sits behind each switch port.

use crate::config::ControllerConfig;
use sdn_types::{PeerType, PortNumber, SwitchId};
use std::collections::{HashMap, HashSet};

/// Read-only map from `(switch, port)` to the type of peer on that port.
///
/// Built once from configuration. Explicit entries win; otherwise ports in
/// the upstream half of a configured edge switch face hosts; everything
/// else is treated as a switch link.
#[derive(Debug, Clone, Default)]
pub struct NeighborTable {
    explicit: HashMap<(SwitchId, PortNumber), PeerType>,
    edge_switches: HashSet<SwitchId>,
    half_branch: u32,
}

impl NeighborTable {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            explicit: config
                .neighbors
                .iter()
                .map(|entry| ((entry.switch, entry.port), entry.peer))
                .collect(),
            edge_switches: config.edge_switches.iter().copied().collect(),
            half_branch: config.half_branch(),
        }
    }

    /// Returns the peer type behind `port` on `switch`.
    pub fn peer_type(&self, switch: SwitchId, port: PortNumber) -> PeerType {
        if let Some(peer) = self.explicit.get(&(switch, port)) {
            return *peer;
        }
        if self.edge_switches.contains(&switch) && port.get() > self.half_branch {
            return PeerType::Host;
        }
        PeerType::Switch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NeighborConfig;

    fn port(n: u32) -> PortNumber {
        PortNumber::new(n).unwrap()
    }

    #[test]
    fn test_unlisted_ports_are_switch_links() {
        let table = NeighborTable::from_config(&ControllerConfig::default());
        for n in 1..=6 {
            assert_eq!(table.peer_type(SwitchId::new(1), port(n)), PeerType::Switch);
        }
    }

    #[test]
    fn test_edge_switch_upper_half_faces_hosts() {
        let mut config = ControllerConfig::default();
        config.edge_switches = vec![SwitchId::new(13)];
        let table = NeighborTable::from_config(&config);

        assert_eq!(table.peer_type(SwitchId::new(13), port(3)), PeerType::Switch);
        assert_eq!(table.peer_type(SwitchId::new(13), port(4)), PeerType::Host);
        assert_eq!(table.peer_type(SwitchId::new(13), port(6)), PeerType::Host);
        assert_eq!(table.peer_type(SwitchId::new(12), port(6)), PeerType::Switch);
    }

    #[test]
    fn test_explicit_entry_overrides_edge_rule() {
        let mut config = ControllerConfig::default();
        config.edge_switches = vec![SwitchId::new(13)];
        config.neighbors = vec![
            NeighborConfig {
                switch: SwitchId::new(13),
                port: port(6),
                peer: PeerType::Switch,
            },
            NeighborConfig {
                switch: SwitchId::new(1),
                port: port(2),
                peer: PeerType::Host,
            },
        ];
        let table = NeighborTable::from_config(&config);

        assert_eq!(table.peer_type(SwitchId::new(13), port(6)), PeerType::Switch);
        assert_eq!(table.peer_type(SwitchId::new(13), port(5)), PeerType::Host);
        assert_eq!(table.peer_type(SwitchId::new(1), port(2)), PeerType::Host);
        assert_eq!(table.peer_type(SwitchId::new(1), port(3)), PeerType::Switch);
    }
}
