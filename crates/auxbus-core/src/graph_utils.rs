//! Island analysis over the bus graph.
//!
//! Buses are nodes; in-service branches and switches are edges. A switch at a branch terminal
//! adds no edge of its own (the terminal already sits at the switch bus) but when open it cuts
//! that terminal off. This is what makes island membership of regular buses invariant under
//! [`crate::expand`] and [`crate::collapse`].

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::{BranchRef, BusId, Network, SwitchId, Terminal, TopologyError, TopologyResult};

/// Which switches fuse their endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchMode {
    /// Only closed switches conduct
    #[default]
    Closed,
    /// Every switch conducts, regardless of state
    All,
}

/// Edge payload of the bus graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Branch(BranchRef),
    Switch(SwitchId),
}

/// Summary statistics produced by `auxbus stats`.
#[derive(Debug)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
}

#[derive(Debug)]
pub struct IslandSummary {
    pub island_id: usize,
    pub node_count: usize,
}

/// Island of one bus, for `--emit` output.
#[derive(Debug)]
pub struct NodeAssignment {
    pub bus: BusId,
    pub label: String,
    pub island_id: usize,
}

#[derive(Debug)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
    pub assignments: Vec<NodeAssignment>,
}

/// Build the undirected bus graph.
///
/// Node order follows bus index order. Fails if a branch or switch references a missing bus,
/// or if a branch switch does not sit at a terminal of its element.
pub fn bus_graph(
    net: &Network,
    mode: SwitchMode,
) -> TopologyResult<(UnGraph<BusId, Link>, HashMap<BusId, NodeIndex>)> {
    let mut graph = UnGraph::with_capacity(net.bus.len(), net.line.len() + net.switch.len());
    let mut nodes = HashMap::with_capacity(net.bus.len());
    for id in net.bus.keys() {
        nodes.insert(*id, graph.add_node(*id));
    }
    let node = |bus: BusId| nodes.get(&bus).copied().ok_or(TopologyError::UnknownBus(bus));

    let mut cut: HashSet<(BranchRef, Terminal)> = HashSet::new();
    let mut claimed: HashSet<(BranchRef, Terminal)> = HashSet::new();
    let mut switch_edges = Vec::new();
    for (id, switch) in &net.switch {
        let from = node(switch.bus)?;
        match net.switch_terminal(*id, switch, &claimed)? {
            Some(key) => {
                claimed.insert(key);
                if !switch.closed && mode == SwitchMode::Closed {
                    cut.insert(key);
                }
            }
            None => {
                if let Some(other) = switch.element.as_bus() {
                    if switch.closed || mode == SwitchMode::All {
                        switch_edges.push((from, node(other)?, Link::Switch(*id)));
                    }
                }
            }
        }
    }

    for branch in net.branch_refs() {
        if net.branch_in_service(branch) != Some(true) {
            continue;
        }
        let live: Vec<NodeIndex> = net
            .terminals(branch)
            .unwrap_or_default()
            .into_iter()
            .filter(|(terminal, _)| !cut.contains(&(branch, *terminal)))
            .map(|(_, bus)| node(bus))
            .collect::<TopologyResult<_>>()?;
        // Star around the first live terminal; enough for connectivity of three-winding units.
        if let Some((first, rest)) = live.split_first() {
            for other in rest {
                graph.add_edge(*first, *other, Link::Branch(branch));
            }
        }
    }

    for (a, b, link) in switch_edges {
        graph.add_edge(a, b, link);
    }

    Ok((graph, nodes))
}

/// Degree and component statistics of the closed-switch bus graph.
pub fn graph_stats(net: &Network) -> TopologyResult<GraphStats> {
    let (graph, _) = bus_graph(net, SwitchMode::Closed)?;
    let node_count = graph.node_count();
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors(node).count())
        .collect();
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    Ok(GraphStats {
        node_count,
        edge_count: graph.edge_count(),
        connected_components: connected_components(&graph),
        min_degree: degrees.iter().copied().min().unwrap_or(0),
        avg_degree,
        max_degree: degrees.iter().copied().max().unwrap_or(0),
    })
}

/// Label connected components of the closed-switch bus graph (breadth-first search).
///
/// Islands are numbered in order of their lowest bus index.
pub fn find_islands(net: &Network) -> TopologyResult<IslandAnalysis> {
    let (graph, _) = bus_graph(net, SwitchMode::Closed)?;
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut assignments = Vec::new();

    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let island_id = islands.len();
        let mut queue = VecDeque::from([start]);
        let mut node_count = 0;
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            node_count += 1;
            let bus = graph[node];
            assignments.push(NodeAssignment {
                bus,
                label: net
                    .bus
                    .get(&bus)
                    .and_then(|row| row.name.clone())
                    .unwrap_or_else(|| format!("bus {bus}")),
                island_id,
            });
            queue.extend(graph.neighbors(node).filter(|n| !visited.contains(n)));
        }
        islands.push(IslandSummary {
            island_id,
            node_count,
        });
    }

    assignments.sort_by_key(|assignment| assignment.bus);
    Ok(IslandAnalysis {
        islands,
        assignments,
    })
}

/// Islands restricted to non-auxiliary buses, each sorted, islands ordered by first bus.
///
/// Islands that only contain auxiliary buses are dropped.
pub fn regular_bus_islands(net: &Network) -> TopologyResult<Vec<Vec<BusId>>> {
    let analysis = find_islands(net)?;
    let mut grouped: BTreeMap<usize, Vec<BusId>> = BTreeMap::new();
    for assignment in analysis.assignments {
        let regular = net
            .bus
            .get(&assignment.bus)
            .is_some_and(|row| !row.is_auxiliary());
        if regular {
            grouped
                .entry(assignment.island_id)
                .or_default()
                .push(assignment.bus);
        }
    }
    let mut islands: Vec<Vec<BusId>> = grouped.into_values().collect();
    islands.sort();
    Ok(islands)
}
