//! Per-call adjacency index over the network tables.
//!
//! Built once from an immutable borrow so the transformations never rescan the branch or
//! switch tables per bus. The index is a snapshot: it is not updated by later mutations.

use std::collections::HashMap;

use crate::{BranchRef, BusId, Network, SwitchElement, SwitchId, Terminal};

/// Incidence lists keyed by bus.
#[derive(Debug, Default)]
pub struct TopologyIndex {
    switches: HashMap<BusId, Vec<SwitchId>>,
    terminals: HashMap<BusId, Vec<(BranchRef, Terminal)>>,
}

impl TopologyIndex {
    pub fn build(net: &Network) -> Self {
        let mut index = TopologyIndex {
            switches: HashMap::with_capacity(net.bus.len()),
            terminals: HashMap::with_capacity(net.bus.len()),
        };

        for (id, switch) in &net.switch {
            index.switches.entry(switch.bus).or_default().push(*id);
            if let SwitchElement::Bus(other) = switch.element {
                index.switches.entry(other).or_default().push(*id);
            }
        }

        for branch in net.branch_refs() {
            for (terminal, bus) in net.terminals(branch).unwrap_or_default() {
                index
                    .terminals
                    .entry(bus)
                    .or_default()
                    .push((branch, terminal));
            }
        }

        index
    }

    /// Switches touching `bus` on either side. A bus-bus switch with both ends on the same bus
    /// is listed twice.
    pub fn switches_at(&self, bus: BusId) -> &[SwitchId] {
        self.switches.get(&bus).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Branch terminals connected to `bus`.
    pub fn terminals_at(&self, bus: BusId) -> &[(BranchRef, Terminal)] {
        self.terminals.get(&bus).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of switch ends plus branch terminals at `bus`.
    pub fn degree(&self, bus: BusId) -> usize {
        self.switches_at(bus).len() + self.terminals_at(bus).len()
    }
}
