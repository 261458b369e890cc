//! Flow table layout and rule priorities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two tables every switch is programmed with.
///
/// Frames enter [`TableId::Forward`]; a miss there continues in
/// [`TableId::Flood`] through an explicit goto-table instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableId {
    /// Exact-destination rules learned at runtime.
    Forward,
    /// Static storm-safe flood rules installed at switch-ready.
    Flood,
}

impl TableId {
    /// Returns the numeric table id programmed on the switch.
    pub const fn id(&self) -> u8 {
        match self {
            TableId::Forward => 0,
            TableId::Flood => 1,
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Forward => write!(f, "forward"),
            TableId::Flood => write!(f, "flood"),
        }
    }
}

/// Flow rule priority. Higher values win within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u16);

impl Priority {
    /// Catch-all and static flood rules.
    pub const TABLE_MISS: Priority = Priority(0);
    /// Learned edge forwarding rules.
    pub const FORWARD: Priority = Priority(1);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ids() {
        assert_eq!(TableId::Forward.id(), 0);
        assert_eq!(TableId::Flood.id(), 1);
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::FORWARD > Priority::TABLE_MISS);
    }
}
