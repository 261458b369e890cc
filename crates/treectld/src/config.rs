//! Controller configuration.
//!
//! Loaded from a TOML file (default `/etc/treectld/treectld.toml`); every
//! field has a default so an empty or missing file yields a working
//! fat-tree controller with branch factor 6.

use crate::error::{ControllerError, ControllerResult};
use sdn_types::{PeerType, PortNumber, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/treectld/treectld.toml";

/// How switches are programmed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ForwardingMode {
    /// Two-table pipeline with storm-safe flooding for fat-tree fabrics.
    #[default]
    Tree,
    /// Single-table learning switch; misses go to the controller.
    Learning,
}

impl fmt::Display for ForwardingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardingMode::Tree => write!(f, "tree"),
            ForwardingMode::Learning => write!(f, "learning"),
        }
    }
}

/// One row of the static neighbor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborConfig {
    pub switch: SwitchId,
    pub port: PortNumber,
    pub peer: PeerType,
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub mode: ForwardingMode,

    /// Fat-tree fan-out; ports `[1, k/2]` are downstream, `[k/2+1, k]` upstream.
    #[serde(default = "default_branch_factor")]
    pub branch_factor: u32,

    /// Also copy flooded frames to the controller so tree mode keeps learning.
    #[serde(default)]
    pub punt_to_controller: bool,

    /// Edge switches: their upstream-half ports face hosts.
    #[serde(default)]
    pub edge_switches: Vec<SwitchId>,

    /// Explicit per-port neighbor types; these win over `edge_switches`.
    #[serde(default)]
    pub neighbors: Vec<NeighborConfig>,
}

fn default_branch_factor() -> u32 {
    6
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: ForwardingMode::default(),
            branch_factor: default_branch_factor(),
            punt_to_controller: false,
            edge_switches: Vec::new(),
            neighbors: Vec::new(),
        }
    }
}

impl ControllerConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> ControllerResult<Self> {
        toml::from_str(content)
            .map_err(|e| ControllerError::invalid_config("config", e.to_string()))
    }

    /// Loads configuration from file, falling back to defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> ControllerResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ControllerError::invalid_config(path.display().to_string(), e.to_string())
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ControllerError::Io(e)),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ControllerResult<()> {
        if self.branch_factor < 2 || self.branch_factor % 2 != 0 {
            return Err(ControllerError::invalid_config(
                "branch_factor",
                format!("must be even and >= 2, got {}", self.branch_factor),
            ));
        }

        if self.branch_factor > PortNumber::MAX {
            return Err(ControllerError::invalid_config(
                "branch_factor",
                format!("exceeds highest port number {}", PortNumber::MAX),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.neighbors {
            if !seen.insert((entry.switch, entry.port)) {
                return Err(ControllerError::invalid_config(
                    "neighbors",
                    format!("duplicate entry for switch {} port {}", entry.switch, entry.port),
                ));
            }
        }

        Ok(())
    }

    /// Half the branch factor: the last downstream port.
    pub fn half_branch(&self) -> u32 {
        self.branch_factor / 2
    }
}
