//! Storage tiers.
//!
//! Every storage node belongs to exactly one tier. Placement state is kept
//! per tier, and key resolution probes tiers in a fixed priority order.

use serde::{Deserialize, Serialize};

/// A storage tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// In-memory nodes. Also hosts cluster metadata keys.
    Memory,
    /// Flash or disk backed nodes.
    Disk,
}

impl Tier {
    /// Every tier, in resolution priority order. Earlier tiers are probed
    /// first when a key's serving set is assembled.
    pub const ALL: [Tier; 2] = [Tier::Memory, Tier::Disk];

    /// The tier that stores cluster metadata keys.
    pub const METADATA: Tier = Tier::Memory;

    /// Stable lowercase name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::Disk => "disk",
        }
    }

    /// Parse a configuration tier name.
    pub fn parse(s: &str) -> Option<Tier> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Some(Tier::Memory),
            "disk" => Some(Tier::Disk),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
