//! Structural checks run by `TopologyBuilder::build`.

use std::collections::{BinaryHeap, HashSet};
use std::cmp::Reverse;

use ffsc_core::CompId;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{TopologyError, TopologyResult};
use crate::topology::{Connection, ConnectionKind};

pub(crate) fn validate_structure(names: &[String], connections: &[Connection]) -> TopologyResult<()> {
    let mut seen_names = HashSet::new();
    for name in names {
        if !seen_names.insert(name.as_str()) {
            return Err(TopologyError::DuplicateName { name: name.clone() });
        }
    }

    let mut pairs = HashSet::new();
    let mut primaries = HashSet::new();
    for c in connections {
        for comp in [c.from, c.to] {
            if comp.index() as usize >= names.len() {
                return Err(TopologyError::UnknownComponent { link: c.id, comp });
            }
        }
        if c.from == c.to {
            return Err(TopologyError::SelfLoop { comp: c.from });
        }
        if !pairs.insert((c.from, c.to)) {
            return Err(TopologyError::DuplicateConnection {
                from: c.from,
                to: c.to,
            });
        }
        if c.kind == ConnectionKind::Primary && !primaries.insert(c.from) {
            return Err(TopologyError::MultiplePrimary { comp: c.from });
        }
    }
    Ok(())
}

pub(crate) fn build_graph(count: usize, connections: &[Connection]) -> DiGraph<CompId, ffsc_core::LinkId> {
    let mut graph = DiGraph::with_capacity(count, connections.len());
    for i in 0..count {
        graph.add_node(CompId::from_index(i as u32));
    }
    for c in connections {
        graph.add_edge(
            NodeIndex::new(c.from.index() as usize),
            NodeIndex::new(c.to.index() as usize),
            c.id,
        );
    }
    graph
}

/// Kahn's algorithm with a min-heap on insertion index, so the order is
/// reproducible and follows declaration order wherever the flow allows.
pub(crate) fn topological_order(
    graph: &DiGraph<CompId, ffsc_core::LinkId>,
) -> TopologyResult<Vec<CompId>> {
    if petgraph::algo::is_cyclic_directed(graph) {
        return Err(TopologyError::Cycle);
    }
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|ix| graph.neighbors_directed(ix, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(indegree.len());
    while let Some(Reverse(i)) = ready.pop() {
        let ix = NodeIndex::new(i);
        order.push(graph[ix]);
        for next in graph.neighbors_directed(ix, Direction::Outgoing) {
            let d = &mut indegree[next.index()];
            *d -= 1;
            if *d == 0 {
                ready.push(Reverse(next.index()));
            }
        }
    }
    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(TopologyError::Cycle)
    }
}
