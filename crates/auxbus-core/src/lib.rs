//! # auxbus-core: Branch Switch Topology Model
//!
//! Provides the table-based network model and the two inverse topology rewrites that move
//! switches between "branch switch" and "bus-bus switch + auxiliary bus" representations.
//!
//! ## Design Philosophy
//!
//! A network is a set of keyed tables, mirroring the pandapower element tables:
//! - **bus**: nodes of the topology, including ephemeral `auxiliary` buses
//! - **line / trafo / trafo3w**: branch elements with two or three terminal buses
//! - **switch**: a breaker between a bus and either another bus or a branch terminal
//! - **bus_geodata**: optional display coordinates per bus
//!
//! Tables are ordered maps keyed by type-safe IDs, so lookups never scan and iteration is
//! deterministic.
//!
//! ## Quick Start
//!
//! ```rust
//! use auxbus_core::*;
//!
//! let mut net = Network::new();
//! let b0 = net.create_bus(20.0, BusOptions::named("MV Bus 0")).unwrap();
//! let b1 = net.create_bus(20.0, BusOptions::named("MV Bus 1")).unwrap();
//! let line = net
//!     .create_line(b0, b1, 1.5, "94-AL1/15-ST1A 20.0", ElementOptions::default())
//!     .unwrap();
//! net.create_switch(b0, SwitchElement::Line(line), true, SwitchOptions::default())
//!     .unwrap();
//!
//! let original = net.clone();
//! expand(&mut net).unwrap();
//! assert_eq!(net.bus.len(), 3);
//!
//! collapse(&mut net).unwrap();
//! assert!(nets_equal(&original, &net, DEFAULT_TOLERANCE));
//! ```
//!
//! ## Modules
//!
//! - [`builder`] - pandapower-style `create_*` helpers with index allocation
//! - [`topology`] - per-call adjacency index (bus -> switches, bus -> branch terminals)
//! - [`transform`] - the Expander ([`expand`]) and the Collapser ([`collapse`])
//! - [`compare`] - tolerant structural equality of two networks
//! - [`graph_utils`] - island analysis over the bus graph
//! - [`diagnostics`] - non-failing validation reports

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub mod builder;
pub mod compare;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod topology;
pub mod transform;

pub use builder::{BusOptions, ElementOptions, SwitchOptions};
pub use compare::{net_diff, nets_equal, DEFAULT_TOLERANCE};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{TopologyError, TopologyResult};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;
pub use topology::TopologyIndex;
pub use transform::{
    collapse, create_branch_switches, expand, replace_branch_switches, CollapseReport,
    ExpandOptions, ExpandReport, GeodataPolicy,
};

/// Integer key of a network table.
pub trait TableId: Copy + Ord + fmt::Display {
    /// Table name used in error messages.
    const TABLE: &'static str;

    fn new(value: usize) -> Self;
    fn value(&self) -> usize;
}

/// serde_json writes NaN as `null`; read it back as NaN.
fn nan_from_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

macro_rules! table_id {
    ($name:ident, $table:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(value: usize) -> Self {
                $name(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl TableId for $name {
            const TABLE: &'static str = $table;

            #[inline]
            fn new(value: usize) -> Self {
                $name(value)
            }
            #[inline]
            fn value(&self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

table_id!(BusId, "bus");
table_id!(LineId, "line");
table_id!(TrafoId, "trafo");
table_id!(Trafo3wId, "trafo3w");
table_id!(SwitchId, "switch");

/// Bus classification, serialized with the pandapower codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BusType {
    /// Busbar
    #[default]
    #[serde(rename = "b")]
    Busbar,
    /// Plain node
    #[serde(rename = "n")]
    Node,
    /// Muff (cable joint)
    #[serde(rename = "m")]
    Muff,
    /// Created only to host the far side of a bus-bus switch that stands in for a branch switch
    #[serde(rename = "auxiliary")]
    Auxiliary,
}

impl BusType {
    pub fn code(&self) -> &'static str {
        match self {
            BusType::Busbar => "b",
            BusType::Node => "n",
            BusType::Muff => "m",
            BusType::Auxiliary => "auxiliary",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "b" => Some(BusType::Busbar),
            "n" => Some(BusType::Node),
            "m" => Some(BusType::Muff),
            "auxiliary" => Some(BusType::Auxiliary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: Option<String>,
    /// Nominal voltage in kV
    #[serde(deserialize_with = "nan_from_null")]
    pub vn_kv: f64,
    #[serde(rename = "type")]
    pub bus_type: BusType,
    pub zone: Option<String>,
    pub in_service: bool,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            name: None,
            vn_kv: 0.0,
            bus_type: BusType::Busbar,
            zone: None,
            in_service: true,
        }
    }
}

impl Bus {
    pub fn is_auxiliary(&self) -> bool {
        self.bus_type == BusType::Auxiliary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub name: Option<String>,
    pub from_bus: BusId,
    pub to_bus: BusId,
    #[serde(deserialize_with = "nan_from_null")]
    pub length_km: f64,
    pub std_type: Option<String>,
    pub in_service: bool,
}

/// Two-winding transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trafo {
    pub name: Option<String>,
    pub hv_bus: BusId,
    pub lv_bus: BusId,
    pub std_type: Option<String>,
    pub in_service: bool,
}

/// Three-winding transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trafo3w {
    pub name: Option<String>,
    pub hv_bus: BusId,
    pub mv_bus: BusId,
    pub lv_bus: BusId,
    pub std_type: Option<String>,
    pub in_service: bool,
}

/// Winding of a three-winding transformer a switch sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winding {
    Hv,
    Mv,
    Lv,
}

/// Named connection point of a branch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    From,
    To,
    Hv,
    Mv,
    Lv,
}

impl Terminal {
    /// Three-winding selector for this terminal, if it names a winding a switch can record.
    pub fn winding(&self) -> Option<Winding> {
        match self {
            Terminal::Hv => Some(Winding::Hv),
            Terminal::Mv => Some(Winding::Mv),
            Terminal::Lv => Some(Winding::Lv),
            Terminal::From | Terminal::To => None,
        }
    }
}

impl From<Winding> for Terminal {
    fn from(winding: Winding) -> Self {
        match winding {
            Winding::Hv => Terminal::Hv,
            Winding::Mv => Terminal::Mv,
            Winding::Lv => Terminal::Lv,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Terminal::From => "from_bus",
            Terminal::To => "to_bus",
            Terminal::Hv => "hv_bus",
            Terminal::Mv => "mv_bus",
            Terminal::Lv => "lv_bus",
        };
        f.write_str(label)
    }
}

/// Handle to a row of one of the branch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BranchRef {
    Line(LineId),
    Trafo(TrafoId),
    Trafo3w(Trafo3wId),
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchRef::Line(id) => write!(f, "line {id}"),
            BranchRef::Trafo(id) => write!(f, "trafo {id}"),
            BranchRef::Trafo3w(id) => write!(f, "trafo3w {id}"),
        }
    }
}

/// The far side of a switch, i.e. the `et`/`element` column pair.
///
/// Three-winding transformer switches carry the winding they sit at because the
/// bus alone does not identify the terminal when two windings share a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "et", content = "element")]
pub enum SwitchElement {
    #[serde(rename = "b")]
    Bus(BusId),
    #[serde(rename = "l")]
    Line(LineId),
    #[serde(rename = "t")]
    Trafo(TrafoId),
    #[serde(rename = "t3")]
    Trafo3w(Trafo3wId, Winding),
}

impl SwitchElement {
    /// pandapower element type code
    pub fn et(&self) -> &'static str {
        match self {
            SwitchElement::Bus(_) => "b",
            SwitchElement::Line(_) => "l",
            SwitchElement::Trafo(_) => "t",
            SwitchElement::Trafo3w(..) => "t3",
        }
    }

    /// Raw element index as stored in the `element` column.
    pub fn index(&self) -> usize {
        match self {
            SwitchElement::Bus(id) => id.value(),
            SwitchElement::Line(id) => id.value(),
            SwitchElement::Trafo(id) => id.value(),
            SwitchElement::Trafo3w(id, _) => id.value(),
        }
    }

    pub fn as_bus(&self) -> Option<BusId> {
        match self {
            SwitchElement::Bus(id) => Some(*id),
            _ => None,
        }
    }

    pub fn branch(&self) -> Option<BranchRef> {
        match self {
            SwitchElement::Bus(_) => None,
            SwitchElement::Line(id) => Some(BranchRef::Line(*id)),
            SwitchElement::Trafo(id) => Some(BranchRef::Trafo(*id)),
            SwitchElement::Trafo3w(id, _) => Some(BranchRef::Trafo3w(*id)),
        }
    }

    pub fn is_branch(&self) -> bool {
        self.branch().is_some()
    }

    /// Switch element that controls `terminal` of `branch`.
    pub fn at_terminal(branch: BranchRef, terminal: Terminal) -> Option<Self> {
        match branch {
            BranchRef::Line(id) => Some(SwitchElement::Line(id)),
            BranchRef::Trafo(id) => Some(SwitchElement::Trafo(id)),
            BranchRef::Trafo3w(id) => terminal
                .winding()
                .map(|winding| SwitchElement::Trafo3w(id, winding)),
        }
    }

    /// Three-winding switch element at the first winding connected to `bus`.
    pub fn trafo3w_at(net: &Network, id: Trafo3wId, bus: BusId) -> TopologyResult<Self> {
        let trafo = net.trafo3w.get(&id).ok_or(TopologyError::UnknownElement {
            table: Trafo3wId::TABLE,
            index: id.value(),
        })?;
        trafo
            .terminals()
            .into_iter()
            .find(|(_, terminal_bus)| *terminal_bus == bus)
            .and_then(|(terminal, _)| terminal.winding())
            .map(|winding| SwitchElement::Trafo3w(id, winding))
            .ok_or_else(|| TopologyError::InconsistentTopology {
                switch: None,
                bus,
                element: BranchRef::Trafo3w(id).to_string(),
                reason: "bus is not connected to any winding".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    /// Bus-side endpoint
    pub bus: BusId,
    pub element: SwitchElement,
    pub closed: bool,
    pub name: Option<String>,
    /// Switch kind such as "LS" or "CB"
    #[serde(rename = "type")]
    pub switch_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusGeodata {
    #[serde(deserialize_with = "nan_from_null")]
    pub x: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub y: f64,
}

/// Uniform terminal access over the branch tables.
pub trait Terminals {
    /// All terminals in canonical order (from/to, hv/lv, hv/mv/lv).
    fn terminals(&self) -> Vec<(Terminal, BusId)>;

    fn terminal_mut(&mut self, terminal: Terminal) -> Option<&mut BusId>;

    fn terminal(&self, terminal: Terminal) -> Option<BusId> {
        self.terminals()
            .into_iter()
            .find(|(t, _)| *t == terminal)
            .map(|(_, bus)| bus)
    }
}

impl Terminals for Line {
    fn terminals(&self) -> Vec<(Terminal, BusId)> {
        vec![(Terminal::From, self.from_bus), (Terminal::To, self.to_bus)]
    }

    fn terminal_mut(&mut self, terminal: Terminal) -> Option<&mut BusId> {
        match terminal {
            Terminal::From => Some(&mut self.from_bus),
            Terminal::To => Some(&mut self.to_bus),
            _ => None,
        }
    }
}

impl Terminals for Trafo {
    fn terminals(&self) -> Vec<(Terminal, BusId)> {
        vec![(Terminal::Hv, self.hv_bus), (Terminal::Lv, self.lv_bus)]
    }

    fn terminal_mut(&mut self, terminal: Terminal) -> Option<&mut BusId> {
        match terminal {
            Terminal::Hv => Some(&mut self.hv_bus),
            Terminal::Lv => Some(&mut self.lv_bus),
            _ => None,
        }
    }
}

impl Terminals for Trafo3w {
    fn terminals(&self) -> Vec<(Terminal, BusId)> {
        vec![
            (Terminal::Hv, self.hv_bus),
            (Terminal::Mv, self.mv_bus),
            (Terminal::Lv, self.lv_bus),
        ]
    }

    fn terminal_mut(&mut self, terminal: Terminal) -> Option<&mut BusId> {
        match terminal {
            Terminal::Hv => Some(&mut self.hv_bus),
            Terminal::Mv => Some(&mut self.mv_bus),
            Terminal::Lv => Some(&mut self.lv_bus),
            _ => None,
        }
    }
}

/// The network: one ordered table per element kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub bus: BTreeMap<BusId, Bus>,
    #[serde(default)]
    pub line: BTreeMap<LineId, Line>,
    #[serde(default)]
    pub trafo: BTreeMap<TrafoId, Trafo>,
    #[serde(default)]
    pub trafo3w: BTreeMap<Trafo3wId, Trafo3w>,
    #[serde(default)]
    pub switch: BTreeMap<SwitchId, Switch>,
    #[serde(default)]
    pub bus_geodata: BTreeMap<BusId, BusGeodata>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            num_buses: self.bus.len(),
            num_auxiliary_buses: self.bus.values().filter(|b| b.is_auxiliary()).count(),
            num_lines: self.line.len(),
            num_trafos: self.trafo.len(),
            num_trafo3ws: self.trafo3w.len(),
            num_switches: self.switch.len(),
            num_branch_switches: self
                .switch
                .values()
                .filter(|sw| sw.element.is_branch())
                .count(),
            num_geodata: self.bus_geodata.len(),
        }
    }

    /// Every branch handle, lines first, then trafos, then three-winding trafos.
    pub fn branch_refs(&self) -> impl Iterator<Item = BranchRef> + '_ {
        self.line
            .keys()
            .map(|id| BranchRef::Line(*id))
            .chain(self.trafo.keys().map(|id| BranchRef::Trafo(*id)))
            .chain(self.trafo3w.keys().map(|id| BranchRef::Trafo3w(*id)))
    }

    /// Terminals of a branch, or `None` if the branch does not exist.
    pub fn terminals(&self, branch: BranchRef) -> Option<Vec<(Terminal, BusId)>> {
        match branch {
            BranchRef::Line(id) => self.line.get(&id).map(Terminals::terminals),
            BranchRef::Trafo(id) => self.trafo.get(&id).map(Terminals::terminals),
            BranchRef::Trafo3w(id) => self.trafo3w.get(&id).map(Terminals::terminals),
        }
    }

    pub fn terminal_bus(&self, branch: BranchRef, terminal: Terminal) -> Option<BusId> {
        match branch {
            BranchRef::Line(id) => self.line.get(&id)?.terminal(terminal),
            BranchRef::Trafo(id) => self.trafo.get(&id)?.terminal(terminal),
            BranchRef::Trafo3w(id) => self.trafo3w.get(&id)?.terminal(terminal),
        }
    }

    pub fn branch_in_service(&self, branch: BranchRef) -> Option<bool> {
        match branch {
            BranchRef::Line(id) => self.line.get(&id).map(|l| l.in_service),
            BranchRef::Trafo(id) => self.trafo.get(&id).map(|t| t.in_service),
            BranchRef::Trafo3w(id) => self.trafo3w.get(&id).map(|t| t.in_service),
        }
    }

    /// Point `terminal` of `branch` at `bus`, returning the bus it referenced before.
    pub fn set_terminal_bus(
        &mut self,
        branch: BranchRef,
        terminal: Terminal,
        bus: BusId,
    ) -> TopologyResult<BusId> {
        let slot = match branch {
            BranchRef::Line(id) => self
                .line
                .get_mut(&id)
                .and_then(|l| l.terminal_mut(terminal)),
            BranchRef::Trafo(id) => self
                .trafo
                .get_mut(&id)
                .and_then(|t| t.terminal_mut(terminal)),
            BranchRef::Trafo3w(id) => self
                .trafo3w
                .get_mut(&id)
                .and_then(|t| t.terminal_mut(terminal)),
        };
        let slot = slot.ok_or_else(|| TopologyError::InconsistentTopology {
            switch: None,
            bus,
            element: branch.to_string(),
            reason: format!("branch has no terminal {terminal}"),
        })?;
        Ok(std::mem::replace(slot, bus))
    }

    /// Resolve which terminal of its element a switch controls.
    ///
    /// Returns `Ok(None)` for bus-bus switches. `claimed` lists terminals already taken by
    /// other switches, so two switches on a line whose ends share one bus get one end each.
    pub fn switch_terminal(
        &self,
        id: SwitchId,
        switch: &Switch,
        claimed: &HashSet<(BranchRef, Terminal)>,
    ) -> TopologyResult<Option<(BranchRef, Terminal)>> {
        let Some(branch) = switch.element.branch() else {
            return Ok(None);
        };
        let inconsistent = |reason: &str| TopologyError::InconsistentTopology {
            switch: Some(id),
            bus: switch.bus,
            element: branch.to_string(),
            reason: reason.to_string(),
        };
        let terminals = self
            .terminals(branch)
            .ok_or_else(|| inconsistent("element does not exist"))?;

        if let SwitchElement::Trafo3w(_, winding) = switch.element {
            let terminal = Terminal::from(winding);
            return match terminals.iter().find(|(t, _)| *t == terminal) {
                Some((_, bus)) if *bus == switch.bus => Ok(Some((branch, terminal))),
                _ => Err(inconsistent("bus is not the recorded winding's terminal")),
            };
        }

        let candidates: Vec<_> = terminals
            .iter()
            .filter(|(_, bus)| *bus == switch.bus)
            .map(|(terminal, _)| (branch, *terminal))
            .collect();
        let first = candidates
            .first()
            .copied()
            .ok_or_else(|| inconsistent("bus is not a terminal of the element"))?;
        Ok(Some(
            candidates
                .into_iter()
                .find(|candidate| !claimed.contains(candidate))
                .unwrap_or(first),
        ))
    }

    /// Replace every missing text field with an empty string.
    ///
    /// Networks read from dataframes distinguish "no name" from "empty name"; call this on
    /// both sides before comparing snapshots that went through different paths.
    pub fn fill_missing_text(&mut self) {
        fn fill(field: &mut Option<String>) {
            if field.is_none() {
                *field = Some(String::new());
            }
        }
        for bus in self.bus.values_mut() {
            fill(&mut bus.name);
            fill(&mut bus.zone);
        }
        for line in self.line.values_mut() {
            fill(&mut line.name);
            fill(&mut line.std_type);
        }
        for trafo in self.trafo.values_mut() {
            fill(&mut trafo.name);
            fill(&mut trafo.std_type);
        }
        for trafo in self.trafo3w.values_mut() {
            fill(&mut trafo.name);
            fill(&mut trafo.std_type);
        }
        for switch in self.switch.values_mut() {
            fill(&mut switch.name);
            fill(&mut switch.switch_type);
        }
    }

    /// IDs of all buses tagged auxiliary.
    pub fn auxiliary_buses(&self) -> Vec<BusId> {
        self.bus
            .iter()
            .filter(|(_, bus)| bus.is_auxiliary())
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Statistics about a network's tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_auxiliary_buses: usize,
    pub num_lines: usize,
    pub num_trafos: usize,
    pub num_trafo3ws: usize,
    pub num_switches: usize,
    pub num_branch_switches: usize,
    pub num_geodata: usize,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses ({} auxiliary), {} lines, {} trafos, {} trafo3ws, {} switches ({} at branches)",
            self.num_buses,
            self.num_auxiliary_buses,
            self.num_lines,
            self.num_trafos,
            self.num_trafo3ws,
            self.num_switches,
            self.num_branch_switches
        )
    }
}
