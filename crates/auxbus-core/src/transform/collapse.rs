use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use super::CollapseReport;
use crate::topology::TopologyIndex;
use crate::{
    BranchRef, BusId, Network, SwitchElement, SwitchId, Terminal, TopologyError, TopologyResult,
};

#[derive(Debug, Clone, Copy)]
struct AuxMerge {
    aux: BusId,
    switch: SwitchId,
    /// Regular bus on the other side of the switch
    bus: BusId,
    branch: BranchRef,
    terminal: Terminal,
    element: SwitchElement,
}

/// Collapse every auxiliary bus into a branch switch.
///
/// Each auxiliary bus must touch exactly one bus-bus switch and exactly one branch terminal.
/// The terminal is moved back onto the switch's other bus, the switch becomes a switch at that
/// terminal, and the auxiliary bus is dropped together with its geodata. Which side of the
/// switch the auxiliary bus sits on does not matter.
///
/// A network without auxiliary buses is returned unchanged.
#[instrument(skip_all, fields(buses = net.bus.len()))]
pub fn create_branch_switches(net: &mut Network) -> TopologyResult<CollapseReport> {
    let merges = plan(net)?;
    if merges.is_empty() {
        debug!("no auxiliary buses to collapse");
        return Ok(CollapseReport::default());
    }

    let mut per_branch: BTreeMap<BranchRef, Vec<(Terminal, BusId)>> = BTreeMap::new();
    for merge in &merges {
        per_branch
            .entry(merge.branch)
            .or_default()
            .push((merge.terminal, merge.bus));
    }
    for (branch, writes) in per_branch {
        for (terminal, bus) in writes {
            net.set_terminal_bus(branch, terminal, bus)?;
        }
    }

    let mut report = CollapseReport::default();
    for merge in &merges {
        if let Some(switch) = net.switch.get_mut(&merge.switch) {
            switch.bus = merge.bus;
            switch.element = merge.element;
        }
        debug!(
            switch = %merge.switch,
            aux = %merge.aux,
            bus = %merge.bus,
            branch = %merge.branch,
            "restored branch switch"
        );
        report.restored.push((merge.switch, merge.branch));
    }

    // Buses go last so no row references a removed bus in between.
    for merge in merges {
        net.bus.remove(&merge.aux);
        net.bus_geodata.remove(&merge.aux);
        report.removed_buses.push(merge.aux);
    }

    info!(
        restored = report.restored.len(),
        "collapsed auxiliary buses into branch switches"
    );
    Ok(report)
}

fn plan(net: &Network) -> TopologyResult<Vec<AuxMerge>> {
    let aux_buses = net.auxiliary_buses();
    if aux_buses.is_empty() {
        return Ok(Vec::new());
    }
    let index = TopologyIndex::build(net);

    aux_buses
        .into_iter()
        .map(|aux| {
            let (switches, terminals) = (index.switches_at(aux), index.terminals_at(aux));
            // Degree 2 alone would also admit two switches or two terminals.
            let (2, &[switch_id], &[(branch, terminal)]) =
                (index.degree(aux), switches, terminals)
            else {
                return Err(TopologyError::DanglingAuxiliaryBus {
                    bus: aux,
                    switches: switches.len(),
                    terminals: terminals.len(),
                });
            };

            let inconsistent = |bus: BusId, reason: &str| TopologyError::InconsistentTopology {
                switch: Some(switch_id),
                bus,
                element: branch.to_string(),
                reason: reason.to_string(),
            };

            let switch = net
                .switch
                .get(&switch_id)
                .ok_or_else(|| inconsistent(aux, "switch row missing"))?;
            let bus = match switch.element {
                SwitchElement::Bus(other) if switch.bus == aux => other,
                SwitchElement::Bus(_) => switch.bus,
                _ => return Err(inconsistent(aux, "auxiliary bus has a branch switch")),
            };
            match net.bus.get(&bus) {
                None => return Err(inconsistent(bus, "switch leads to a missing bus")),
                Some(row) if row.is_auxiliary() => {
                    return Err(inconsistent(bus, "switch joins two auxiliary buses"))
                }
                Some(_) => {}
            }
            let element = SwitchElement::at_terminal(branch, terminal)
                .ok_or_else(|| inconsistent(aux, "terminal cannot carry a switch"))?;

            Ok(AuxMerge {
                aux,
                switch: switch_id,
                bus,
                branch,
                terminal,
                element,
            })
        })
        .collect()
}
