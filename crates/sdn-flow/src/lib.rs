//! Typed flow-table commands for the SDN controller.
//!
//! This crate models the narrow command surface the controller drives on a
//! switch, without committing to any wire encoding:
//!
//! - [`rule`]: match predicates, actions, instructions and flow rules
//! - [`table`]: the two-stage table layout and rule priorities
//! - [`packet`]: per-packet output instructions
//! - [`fabric`]: the [`SwitchFabric`] trait plus channel and recording fabrics
//!
//! # Example
//!
//! ```
//! use sdn_flow::{Action, FlowMatch, FlowRule, Instruction, Priority, TableId};
//! use sdn_types::{MacAddress, PortNumber};
//!
//! let port = PortNumber::new(2).unwrap();
//! let rule = FlowRule::new(
//!     TableId::Forward,
//!     FlowMatch::any().with_eth_dst(MacAddress::new([0, 0, 0, 0, 0, 0xaa])),
//!     Priority::FORWARD,
//!     vec![Instruction::apply(vec![Action::output(port)])],
//! );
//! assert_eq!(rule.output_ports(), vec![port]);
//! ```

pub mod error;
pub mod fabric;
pub mod packet;
pub mod rule;
pub mod table;

pub use error::{FabricError, FabricResult};
pub use fabric::{ChannelFabric, FabricCommand, RecordingFabric, SwitchFabric};
pub use packet::{PacketData, PacketOut};
pub use rule::{Action, FlowMatch, FlowRule, Instruction, OutputPort};
pub use table::{Priority, TableId};
