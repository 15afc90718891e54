//! Validated, immutable topology.

use ffsc_core::{CompId, LinkId};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{TopologyError, TopologyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// Loads the upstream component: defines its back pressure and demand.
    Primary,
    /// Side bleed reading the upstream outlet stream.
    Tap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: LinkId,
    pub from: CompId,
    pub to: CompId,
    pub kind: ConnectionKind,
}

#[derive(Debug, Clone)]
pub struct SystemTopology {
    pub(crate) names: Vec<String>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) graph: DiGraph<CompId, LinkId>,
    pub(crate) order: Vec<CompId>,
}

impl SystemTopology {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, comp: CompId) -> &str {
        self.names
            .get(comp.index() as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn id(&self, name: &str) -> TopologyResult<CompId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| CompId::from_index(i as u32))
            .ok_or_else(|| TopologyError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn components(&self) -> impl Iterator<Item = (CompId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (CompId::from_index(i as u32), n.as_str()))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Upstream-to-downstream visiting order. Ties resolve by insertion order.
    pub fn order(&self) -> &[CompId] {
        &self.order
    }

    /// Upstream components feeding `comp`, in connection order.
    pub fn inlets(&self, comp: CompId) -> Vec<CompId> {
        self.connections
            .iter()
            .filter(|c| c.to == comp)
            .map(|c| c.from)
            .collect()
    }

    /// Component loading `comp` through its primary connection.
    pub fn primary_downstream(&self, comp: CompId) -> Option<CompId> {
        self.connections
            .iter()
            .find(|c| c.from == comp && c.kind == ConnectionKind::Primary)
            .map(|c| c.to)
    }

    /// Every component downstream of `comp`, transitively.
    pub fn downstream_closure(&self, comp: CompId) -> Vec<CompId> {
        let start = NodeIndex::new(comp.index() as usize);
        let mut dfs = petgraph::visit::Dfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(ix) = dfs.next(&self.graph) {
            if ix != start {
                out.push(self.graph[ix]);
            }
        }
        out.sort();
        out
    }
}
