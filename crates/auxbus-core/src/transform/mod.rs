//! Inverse topology rewrites between branch switches and auxiliary-bus switches.
//!
//! pandapower lets a switch sit directly at a branch terminal (`et` = `l`, `t`, `t3`). Some
//! data formats only know bus-bus switches, so a branch switch has to be represented by an
//! extra node:
//!
//! ```text
//!   before:  B ──[S]── line            after:  B ──[S]── A ── line
//!            (S.et = "l")                      (S.et = "b", A is auxiliary)
//! ```
//!
//! [`replace_branch_switches`] performs the rewrite on the left, [`create_branch_switches`]
//! undoes it. Both validate the whole network before touching it, so on error the network is
//! unchanged. Neither changes a switch's open/closed state.

mod collapse;
mod expand;

use serde::{Deserialize, Serialize};

use crate::{BranchRef, BusGeodata, BusId, Network, SwitchId, TopologyResult};

pub use collapse::create_branch_switches;
pub use expand::replace_branch_switches;

/// Where an auxiliary bus is drawn relative to the bus it was split from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GeodataPolicy {
    /// Same coordinates as the original bus
    #[default]
    Duplicate,
    /// Original coordinates shifted by a fixed offset
    Offset { dx: f64, dy: f64 },
}

impl GeodataPolicy {
    pub fn place(&self, origin: BusGeodata) -> BusGeodata {
        match *self {
            GeodataPolicy::Duplicate => origin,
            GeodataPolicy::Offset { dx, dy } => BusGeodata {
                x: origin.x + dx,
                y: origin.y + dy,
            },
        }
    }
}

/// Options for [`replace_branch_switches`]
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    pub geodata: GeodataPolicy,
    /// Names auxiliary buses must not take, e.g. those handed out by an earlier run.
    pub reserved_names: Vec<String>,
    /// Separator between the original bus name and the counter of an auxiliary bus name.
    pub name_separator: String,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            geodata: GeodataPolicy::Duplicate,
            reserved_names: Vec::new(),
            name_separator: "_".to_string(),
        }
    }
}

/// Outcome of [`replace_branch_switches`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandReport {
    /// Rewritten switch and the auxiliary bus now at its element side
    pub aux_buses: Vec<(SwitchId, BusId)>,
    /// Names given to auxiliary buses, to be reserved by later runs
    pub aux_names: Vec<String>,
}

/// Outcome of [`create_branch_switches`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapseReport {
    /// Switch turned back into a branch switch and the branch it now controls
    pub restored: Vec<(SwitchId, BranchRef)>,
    pub removed_buses: Vec<BusId>,
}

/// Expand every branch switch with default options.
pub fn expand(net: &mut Network) -> TopologyResult<ExpandReport> {
    replace_branch_switches(net, &ExpandOptions::default())
}

/// Collapse every auxiliary bus back into a branch switch.
pub fn collapse(net: &mut Network) -> TopologyResult<CollapseReport> {
    create_branch_switches(net)
}
