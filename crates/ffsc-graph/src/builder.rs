//! Incremental topology builder.

use ffsc_core::{CompId, LinkId};

use crate::error::TopologyResult;
use crate::topology::{Connection, ConnectionKind, SystemTopology};
use crate::validate;

/// Builder for the engine topology.
///
/// Use `add_component`, `connect` and `tap`, then `build()` to validate and
/// freeze the result.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    names: Vec<String>,
    connections: Vec<Connection>,
    next_comp_id: u32,
    next_link_id: u32,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, name: impl Into<String>) -> CompId {
        let id = CompId::from_index(self.next_comp_id);
        self.next_comp_id += 1;
        self.names.push(name.into());
        id
    }

    fn push(&mut self, from: CompId, to: CompId, kind: ConnectionKind) -> LinkId {
        let id = LinkId::from_index(self.next_link_id);
        self.next_link_id += 1;
        self.connections.push(Connection { id, from, to, kind });
        id
    }

    /// Primary flow connection: `to` loads `from`.
    pub fn connect(&mut self, from: CompId, to: CompId) -> LinkId {
        self.push(from, to, ConnectionKind::Primary)
    }

    /// Side bleed from `from` into `to`.
    pub fn tap(&mut self, from: CompId, to: CompId) -> LinkId {
        self.push(from, to, ConnectionKind::Tap)
    }

    pub fn build(self) -> TopologyResult<SystemTopology> {
        validate::validate_structure(&self.names, &self.connections)?;
        let graph = validate::build_graph(self.names.len(), &self.connections);
        let order = validate::topological_order(&graph)?;
        Ok(SystemTopology {
            names: self.names,
            connections: self.connections,
            graph,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut b = TopologyBuilder::new();
        let a = b.add_component("pump");
        let c = b.add_component("line");
        let l = b.connect(a, c);
        assert_eq!(a.index(), 0);
        assert_eq!(c.index(), 1);
        assert_eq!(l.index(), 0);
    }

    #[test]
    fn order_follows_flow_then_declaration() {
        let mut b = TopologyBuilder::new();
        let down = b.add_component("plenum");
        let up2 = b.add_component("line_b");
        let up1 = b.add_component("line_a");
        b.connect(up1, down);
        b.connect(up2, down);
        let topo = b.build().unwrap();
        assert_eq!(topo.order(), &[up2, up1, down]);
        assert_eq!(topo.inlets(down), vec![up1, up2]);
    }

    #[test]
    fn cycle_rejected() {
        let mut b = TopologyBuilder::new();
        let x = b.add_component("x");
        let y = b.add_component("y");
        b.connect(x, y);
        b.tap(y, x);
        assert_eq!(b.build().unwrap_err(), TopologyError::Cycle);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut b = TopologyBuilder::new();
        b.add_component("nozzle");
        b.add_component("nozzle");
        assert!(matches!(
            b.build().unwrap_err(),
            TopologyError::DuplicateName { .. }
        ));
    }

    #[test]
    fn two_primaries_rejected_but_taps_allowed() {
        let mut b = TopologyBuilder::new();
        let src = b.add_component("chamber");
        let n = b.add_component("nozzle");
        let hx = b.add_component("hx");
        b.connect(src, n);
        b.tap(src, hx);
        let topo = b.build().unwrap();
        assert_eq!(topo.primary_downstream(src), Some(n));

        let mut b = TopologyBuilder::new();
        let src = b.add_component("chamber");
        let n = b.add_component("nozzle");
        let hx = b.add_component("hx");
        b.connect(src, n);
        b.connect(src, hx);
        assert!(matches!(
            b.build().unwrap_err(),
            TopologyError::MultiplePrimary { .. }
        ));
    }

    #[test]
    fn self_loop_and_unknown_rejected() {
        let mut b = TopologyBuilder::new();
        let x = b.add_component("x");
        b.connect(x, x);
        assert!(matches!(b.build().unwrap_err(), TopologyError::SelfLoop { .. }));

        let mut b = TopologyBuilder::new();
        let x = b.add_component("x");
        b.connect(x, CompId::from_index(7));
        assert!(matches!(
            b.build().unwrap_err(),
            TopologyError::UnknownComponent { .. }
        ));
    }
}
