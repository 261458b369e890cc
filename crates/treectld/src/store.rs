//! Per-switch learning state.
//!
//! Each switch owns one [`SwitchState`] behind its own mutex; the outer
//! [`DashMap`] is only held long enough to fetch that entry. Frames for
//! different switches therefore never contend on a shared lock, while
//! learn/lookup on one switch is serialized.
//!
//! Lookups never create entries. Only [`SwitchStateStore::ensure`],
//! [`SwitchStateStore::learn`] and [`SwitchStateStore::begin_configuring`]
//! do, and they say so.

use dashmap::DashMap;
use parking_lot::Mutex;
use sdn_types::{MacAddress, PortNumber, SwitchId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle phase of a connected switch.
///
/// A switch with no entry in the store is disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPhase {
    /// Seen through a frame before any switch-ready; state created lazily.
    Discovered,
    /// Baseline rules are being installed.
    Configuring,
    /// Baseline rules installed; frames are handled normally.
    Active,
    /// Baseline programming failed; frames are dropped until the next
    /// switch-ready.
    ConfigFailed,
}

impl SwitchPhase {
    /// Returns true if frames for the switch should be processed.
    pub const fn accepts_frames(&self) -> bool {
        !matches!(self, SwitchPhase::ConfigFailed)
    }
}

impl fmt::Display for SwitchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwitchPhase::Discovered => "discovered",
            SwitchPhase::Configuring => "configuring",
            SwitchPhase::Active => "active",
            SwitchPhase::ConfigFailed => "config_failed",
        };
        write!(f, "{}", s)
    }
}

/// Everything the controller remembers about one switch.
#[derive(Debug, Clone)]
pub struct SwitchState {
    pub phase: SwitchPhase,
    bindings: HashMap<MacAddress, PortNumber>,
}

impl SwitchState {
    fn new(phase: SwitchPhase) -> Self {
        Self {
            phase,
            bindings: HashMap::new(),
        }
    }

    /// Records `mac` behind `port`, replacing any earlier binding.
    ///
    /// Returns the previous port if the address moved.
    pub fn learn(&mut self, mac: MacAddress, port: PortNumber) -> Option<PortNumber> {
        self.bindings.insert(mac, port).filter(|old| *old != port)
    }

    pub fn lookup(&self, mac: &MacAddress) -> Option<PortNumber> {
        self.bindings.get(mac).copied()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

type SharedState = Arc<Mutex<SwitchState>>;

/// Store of learned address-to-port bindings, keyed by switch.
#[derive(Debug, Default)]
pub struct SwitchStateStore {
    switches: DashMap<SwitchId, SharedState>,
}

impl SwitchStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, switch: SwitchId) -> Option<SharedState> {
        self.switches.get(&switch).map(|e| Arc::clone(e.value()))
    }

    /// Returns the entry for `switch`, creating an empty [`SwitchPhase::Discovered`]
    /// entry if the switch has never been seen. Idempotent.
    pub fn ensure(&self, switch: SwitchId) -> SharedState {
        let entry = self
            .switches
            .entry(switch)
            .or_insert_with(|| Arc::new(Mutex::new(SwitchState::new(SwitchPhase::Discovered))));
        Arc::clone(entry.value())
    }

    /// Records `mac` behind `port` on `switch`; last write wins.
    pub fn learn(&self, switch: SwitchId, mac: MacAddress, port: PortNumber) {
        self.ensure(switch).lock().learn(mac, port);
    }

    /// Returns the last port `mac` was learned on, if any.
    pub fn lookup(&self, switch: SwitchId, mac: &MacAddress) -> Option<PortNumber> {
        let shared = self.entry(switch)?;
        let state = shared.lock();
        state.lookup(mac)
    }

    /// Runs `f` with exclusive access to the switch's state, creating it if needed.
    ///
    /// Use this when several reads and writes must observe one consistent state.
    pub fn with_switch<R>(&self, switch: SwitchId, f: impl FnOnce(&mut SwitchState) -> R) -> R {
        let shared = self.ensure(switch);
        let mut state = shared.lock();
        f(&mut state)
    }

    /// Starts a fresh connection: bindings are cleared and the phase is
    /// set to [`SwitchPhase::Configuring`].
    pub fn begin_configuring(&self, switch: SwitchId) {
        self.switches.insert(
            switch,
            Arc::new(Mutex::new(SwitchState::new(SwitchPhase::Configuring))),
        );
    }

    /// Moves an existing switch to `phase`. Returns false if the switch is unknown.
    pub fn set_phase(&self, switch: SwitchId, phase: SwitchPhase) -> bool {
        match self.entry(switch) {
            Some(shared) => {
                shared.lock().phase = phase;
                true
            }
            None => false,
        }
    }

    /// Returns the phase of `switch`, or `None` if it is disconnected.
    pub fn phase(&self, switch: SwitchId) -> Option<SwitchPhase> {
        let shared = self.entry(switch)?;
        let phase = shared.lock().phase;
        Some(phase)
    }

    /// Drops all state for `switch`. Returns the number of bindings discarded.
    pub fn purge(&self, switch: SwitchId) -> Option<usize> {
        let (_, shared) = self.switches.remove(&switch)?;
        let count = shared.lock().binding_count();
        Some(count)
    }

    /// Number of bindings learned on `switch`.
    pub fn binding_count(&self, switch: SwitchId) -> usize {
        match self.entry(switch) {
            Some(shared) => {
                let state = shared.lock();
                state.binding_count()
            }
            None => 0,
        }
    }

    /// Number of switches with state.
    pub fn switch_count(&self) -> usize {
        self.switches.len()
    }
}
