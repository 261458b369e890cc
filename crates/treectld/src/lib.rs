//! # treectld - Fat-Tree SDN Controller
//!
//! Control-plane logic for a layer-2 learning controller that programs
//! switches of a multi-rooted (fat-tree) fabric without a spanning tree.
//!
//! ## Responsibilities
//! - Per-switch MAC learning ([`store`])
//! - Flood vs. unicast decisions for frames punted to the controller ([`engine`])
//! - Translating decisions into flow rules and packet-outs ([`programmer`])
//! - Storm-safe flood rules derived from the branch factor ([`flood`])
//!
//! ## Table Layout (tree mode)
//! - Table 0 (Forward): learned `eth_dst` rules at priority 1, miss goes to table 1
//! - Table 1 (Flood): one `in_port` rule per downstream port plus a native-flood default
//!
//! The fabric itself is reached only through [`sdn_flow::SwitchFabric`].

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod flood;
pub mod pipeline;
pub mod programmer;
pub mod store;
pub mod topology;

pub use config::{ControllerConfig, ForwardingMode, NeighborConfig, DEFAULT_CONFIG_PATH};
pub use controller::{Controller, ControllerStats, StatsSnapshot};
pub use dispatcher::{Dispatcher, EventHandler, EventOutcome};
pub use engine::{DiscardReason, ForwardingEngine, FrameDecision};
pub use error::{ControllerError, ControllerResult};
pub use events::{EventKind, FabricEvent, FrameArrived, SwitchFeatures};
pub use flood::FloodPlanner;
pub use pipeline::{ForwardingPipeline, LearningPipeline, TreePipeline};
pub use programmer::FlowProgrammer;
pub use store::{SwitchPhase, SwitchState, SwitchStateStore};
pub use topology::NeighborTable;
