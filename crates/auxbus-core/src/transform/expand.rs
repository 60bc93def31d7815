use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, instrument};

use super::{ExpandOptions, ExpandReport};
use crate::builder::allocate_indices;
use crate::{
    BranchRef, Bus, BusGeodata, BusId, BusType, Network, SwitchElement, SwitchId, Terminal,
    TopologyError, TopologyResult,
};

/// One branch switch to be rewritten: the terminal it controls and the bus row that will
/// replace it.
#[derive(Debug, Clone)]
struct SwitchRewrite {
    switch: SwitchId,
    bus: BusId,
    branch: BranchRef,
    terminal: Terminal,
    aux: BusId,
    aux_row: Bus,
    aux_geodata: Option<BusGeodata>,
}

/// Replace every branch switch by a bus-bus switch to a new auxiliary bus.
///
/// **Algorithm:**
/// 1. Resolve the terminal each branch switch controls (fails on switches whose bus is not a
///    terminal of their element).
/// 2. Allocate one fresh bus index per switch, above every existing index where room is left.
/// 3. Insert the auxiliary buses (voltage, zone and service state copied from the switch bus).
/// 4. Point each controlled terminal at its auxiliary bus, grouped per branch element.
/// 5. Turn each switch into a bus-bus switch between its bus and the auxiliary bus.
///
/// Steps 1-2 only read the network; all failures happen there. Each rewrite touches its own
/// auxiliary bus, one branch terminal and one switch, so the result does not depend on the
/// order switches are processed in.
#[instrument(skip_all, fields(switches = net.switch.len()))]
pub fn replace_branch_switches(
    net: &mut Network,
    opts: &ExpandOptions,
) -> TopologyResult<ExpandReport> {
    let rewrites = plan(net, opts)?;

    let mut per_branch: BTreeMap<BranchRef, Vec<(Terminal, BusId)>> = BTreeMap::new();
    for rewrite in &rewrites {
        net.bus.insert(rewrite.aux, rewrite.aux_row.clone());
        if let Some(geo) = rewrite.aux_geodata {
            net.bus_geodata.insert(rewrite.aux, geo);
        }
        per_branch
            .entry(rewrite.branch)
            .or_default()
            .push((rewrite.terminal, rewrite.aux));
    }

    for (branch, writes) in per_branch {
        for (terminal, aux) in writes {
            net.set_terminal_bus(branch, terminal, aux)?;
        }
    }

    let mut report = ExpandReport::default();
    for rewrite in rewrites {
        if let Some(switch) = net.switch.get_mut(&rewrite.switch) {
            switch.element = SwitchElement::Bus(rewrite.aux);
        }
        debug!(
            switch = %rewrite.switch,
            bus = %rewrite.bus,
            aux = %rewrite.aux,
            branch = %rewrite.branch,
            terminal = %rewrite.terminal,
            "moved branch switch onto auxiliary bus"
        );
        report.aux_buses.push((rewrite.switch, rewrite.aux));
        report.aux_names.extend(rewrite.aux_row.name);
    }

    info!(aux_buses = report.aux_buses.len(), "replaced branch switches");
    Ok(report)
}

fn plan(net: &Network, opts: &ExpandOptions) -> TopologyResult<Vec<SwitchRewrite>> {
    let mut claimed: HashSet<(BranchRef, Terminal)> = HashSet::new();
    let mut targets = Vec::new();

    for (id, switch) in &net.switch {
        if !switch.element.is_branch() {
            continue;
        }
        let inconsistent = |reason: &str| TopologyError::InconsistentTopology {
            switch: Some(*id),
            bus: switch.bus,
            element: switch
                .element
                .branch()
                .map(|b| b.to_string())
                .unwrap_or_default(),
            reason: reason.to_string(),
        };
        let origin = net
            .bus
            .get(&switch.bus)
            .ok_or_else(|| inconsistent("switch bus does not exist"))?;
        let Some((branch, terminal)) = net.switch_terminal(*id, switch, &claimed)? else {
            continue;
        };
        if !claimed.insert((branch, terminal)) {
            return Err(inconsistent(
                "terminal is already controlled by another switch",
            ));
        }
        targets.push((*id, switch.bus, origin, branch, terminal));
    }

    let aux_ids: Vec<BusId> = allocate_indices(&net.bus, targets.len())?;
    let mut namer = AuxNamer::new(net, opts);

    Ok(targets
        .into_iter()
        .zip(aux_ids)
        .map(|((switch, bus, origin, branch, terminal), aux)| SwitchRewrite {
            switch,
            bus,
            branch,
            terminal,
            aux,
            aux_row: Bus {
                name: origin.name.as_deref().map(|base| namer.next(base)),
                vn_kv: origin.vn_kv,
                bus_type: BusType::Auxiliary,
                zone: origin.zone.clone(),
                in_service: origin.in_service,
            },
            aux_geodata: net
                .bus_geodata
                .get(&bus)
                .map(|geo| opts.geodata.place(*geo)),
        })
        .collect())
}

/// Hands out `<base><sep><n>` names, counting per base name and skipping names in use.
struct AuxNamer<'a> {
    separator: &'a str,
    used: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl<'a> AuxNamer<'a> {
    fn new(net: &Network, opts: &'a ExpandOptions) -> Self {
        let used = net
            .bus
            .values()
            .filter_map(|bus| bus.name.clone())
            .chain(opts.reserved_names.iter().cloned())
            .collect();
        Self {
            separator: &opts.name_separator,
            used,
            counters: HashMap::new(),
        }
    }

    fn next(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{base}{}{counter}", self.separator);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
