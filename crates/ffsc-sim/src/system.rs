//! The engine network integrator.
//!
//! One step visits every component once in upstream-to-downstream order.
//! Each component sees the outlets produced earlier in the same pass and the
//! committed back pressure and demand of its primary downstream neighbour.
//! New states are held aside and committed only when the whole pass succeeded.

use ffsc_components::{Component, ComponentDef, FlowState, InletConditions, PendingState};
use ffsc_core::{CompId, GapReport, GapResult, MissingPropertyData};
use ffsc_graph::{SystemTopology, TopologyBuilder, TopologyError};
use ffsc_props::{PropertyBundle, load_json};
use tracing::{debug, info, warn};

use crate::config::{ENGINE_TABLE, EngineConfig, TablePaths};
use crate::error::{EngineError, EngineResult};
use crate::snapshot::{PortSnapshot, StateSnapshot};

const OWNER: &str = "EngineSystem";

/// Step size used by [`EngineSystem::missing_data`] before the first step.
pub const DEFAULT_CHECK_DT: f64 = 0.1;

/// Lifecycle of an assembled system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// Built, no step taken yet.
    Assembled,
    Stepping,
    /// A step failed; the system refuses further steps.
    Halted,
    Completed,
}

/// Snapshots of a multi-step run and the error that stopped it early, if any.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub snapshots: Vec<StateSnapshot>,
    pub stopped: Option<EngineError>,
}

impl RunRecord {
    pub fn is_complete(&self) -> bool {
        self.stopped.is_none()
    }
}

/// Outcome of one pass: per-component result in component order, and every gap.
struct Pass {
    results: Vec<Option<(FlowState, PendingState)>>,
    gaps: GapReport,
}

#[derive(Debug, Clone)]
pub struct EngineSystem {
    props: PropertyBundle,
    topology: SystemTopology,
    /// Indexed by `CompId::index()`.
    components: Vec<Component>,
    status: SystemStatus,
    halted_on: Option<MissingPropertyData>,
    index: u64,
    time: f64,
    check_dt: f64,
}

fn build_topology(config: &EngineConfig) -> EngineResult<SystemTopology> {
    let mut builder = TopologyBuilder::new();
    for def in &config.components {
        builder.add_component(def.name.clone());
    }
    let lookup = |name: &str| {
        config
            .components
            .iter()
            .position(|d| d.name == name)
            .map(|i| CompId::from_index(i as u32))
            .ok_or_else(|| TopologyError::NotFound {
                name: name.to_string(),
            })
    };
    for conn in &config.connections {
        let (from, to) = (lookup(&conn.from)?, lookup(&conn.to)?);
        if conn.primary {
            builder.connect(from, to);
        } else {
            builder.tap(from, to);
        }
    }
    Ok(builder.build()?)
}

fn check_dt(dt: f64) -> EngineResult<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidArg {
            what: "dt must be positive and finite",
        })
    }
}

impl EngineSystem {
    /// Load every table, build the components and wire the topology.
    ///
    /// Table gaps are collected across all files before failing.
    pub fn build_from_files(paths: &TablePaths) -> EngineResult<Self> {
        let mut gaps = GapReport::new();
        let props = match PropertyBundle::load(&paths.property_files()) {
            Ok(props) => Some(props),
            Err(report) => {
                gaps.extend(report);
                None
            }
        };
        let config = match load_json::<EngineConfig>(&paths.engine(), OWNER, ENGINE_TABLE) {
            Ok(config) => config,
            Err(gap) => {
                gaps.insert(gap);
                warn!(gaps = gaps.len(), "engine assembly failed");
                return Err(EngineError::Assembly(gaps));
            }
        };
        let topology = build_topology(&config)?;
        let table_path = |def: &ComponentDef| def.table.as_deref().and_then(|key| paths.resolve(key));
        let Some(props) = props else {
            // Without property tables the components cannot be built, but
            // their own params and tables can still be checked.
            for def in &config.components {
                gaps.extend(Component::check_def(def, table_path(def).as_deref()));
            }
            warn!(gaps = gaps.len(), "engine assembly failed");
            return Err(EngineError::Assembly(gaps));
        };

        let mut components = Vec::with_capacity(config.components.len());
        for def in &config.components {
            match Component::from_def(def, table_path(def).as_deref(), &props) {
                Ok(component) => components.push(component),
                Err(report) => gaps.extend(report),
            }
        }
        if !gaps.is_empty() {
            warn!(gaps = gaps.len(), "engine assembly failed");
            return Err(EngineError::Assembly(gaps));
        }

        info!(
            root = %paths.root().display(),
            components = components.len(),
            connections = topology.connections().len(),
            "engine assembled"
        );
        Ok(Self {
            props,
            topology,
            components,
            status: SystemStatus::Assembled,
            halted_on: None,
            index: 0,
            time: 0.0,
            check_dt: DEFAULT_CHECK_DT,
        })
    }

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    /// Number of committed steps.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Simulated time [s].
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn props(&self) -> &PropertyBundle {
        &self.props
    }

    pub fn topology(&self) -> &SystemTopology {
        &self.topology
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.topology
            .order()
            .iter()
            .filter_map(|id| self.components.get(id.index() as usize))
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    fn component_at(&self, id: CompId) -> Option<&Component> {
        self.components.get(id.index() as usize)
    }

    /// Committed upstream-facing pressure of the nearest primary downstream
    /// component that has one.
    fn back_pressure(&self, id: CompId) -> GapResult<Option<f64>> {
        let mut next = self.topology.primary_downstream(id);
        while let Some(down) = next {
            if let Some(component) = self.component_at(down) {
                if let Some(p) = component.upstream_pressure(&self.props)? {
                    return Ok(Some(p));
                }
            }
            next = self.topology.primary_downstream(down);
        }
        Ok(None)
    }

    fn inlet_conditions(&self, id: CompId, streams: Vec<FlowState>) -> GapResult<InletConditions> {
        let mut inlet = InletConditions::new(streams);
        if let Some(p) = self.back_pressure(id)? {
            inlet = inlet.with_back_pressure(p);
        }
        let demand = self
            .topology
            .primary_downstream(id)
            .and_then(|down| self.component_at(down))
            .and_then(Component::demand);
        if let Some(mdot) = demand {
            inlet = inlet.with_demand(mdot);
        }
        Ok(inlet)
    }

    /// Advance every component without committing.
    ///
    /// A component whose upstream produced no outlet is skipped. With
    /// `fail_fast` the pass stops at the first gap.
    fn pass(&self, dt: f64, fail_fast: bool) -> Pass {
        let mut results: Vec<Option<(FlowState, PendingState)>> =
            (0..self.components.len()).map(|_| None).collect();
        let mut gaps = GapReport::new();

        for &id in self.topology.order() {
            let Some(component) = self.component_at(id) else {
                continue;
            };
            let streams: Option<Vec<FlowState>> = self
                .topology
                .inlets(id)
                .into_iter()
                .map(|up| {
                    results
                        .get(up.index() as usize)
                        .and_then(Option::as_ref)
                        .map(|(outlet, _)| outlet.clone())
                })
                .collect();
            let Some(streams) = streams else {
                debug!(component = component.name(), "skipped, upstream unavailable");
                continue;
            };

            let outcome = self
                .inlet_conditions(id, streams)
                .and_then(|inlet| component.advance(dt, &inlet, &self.props));
            match outcome {
                Ok(result) => {
                    if let Some(slot) = results.get_mut(id.index() as usize) {
                        *slot = Some(result);
                    }
                }
                Err(gap) => {
                    debug!(component = component.name(), %gap, "component advance failed");
                    gaps.insert(gap);
                    if fail_fast {
                        break;
                    }
                }
            }
        }
        Pass { results, gaps }
    }

    /// Every gap a step of the last used size would hit, without mutating state.
    pub fn missing_data(&self) -> GapReport {
        self.missing_data_at(self.check_dt)
    }

    /// Every gap a step of size `dt` would hit, without mutating state.
    pub fn missing_data_at(&self, dt: f64) -> GapReport {
        self.pass(dt, false).gaps
    }

    fn ensure_active(&self) -> EngineResult<()> {
        match (self.status, &self.halted_on) {
            (SystemStatus::Completed, _) => Err(EngineError::Completed),
            (SystemStatus::Halted, Some(cause)) => Err(EngineError::Halted {
                cause: cause.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Advance the whole network by `dt` seconds.
    ///
    /// Either every component commits its new state or none does. A failed
    /// step halts the system.
    pub fn step(&mut self, dt: f64) -> EngineResult<StateSnapshot> {
        self.ensure_active()?;
        check_dt(dt)?;

        let pass = self.pass(dt, true);
        if let Some(gap) = pass.gaps.into_iter().next() {
            warn!(step = self.index + 1, %gap, "step halted");
            self.status = SystemStatus::Halted;
            self.halted_on = Some(gap.clone());
            return Err(EngineError::MissingData(gap));
        }

        let mut outlets = Vec::with_capacity(self.components.len());
        for (component, result) in self.components.iter_mut().zip(pass.results) {
            outlets.push(result.map(|(outlet, pending)| {
                component.commit(pending);
                outlet
            }));
        }
        self.index += 1;
        self.time += dt;
        self.check_dt = dt;
        self.status = SystemStatus::Stepping;

        let snapshot = self.snapshot(&outlets);
        debug!(
            step = snapshot.index,
            time = snapshot.time_s,
            thrust = snapshot.thrust_n,
            "step committed"
        );
        Ok(snapshot)
    }

    fn snapshot(&self, outlets: &[Option<FlowState>]) -> StateSnapshot {
        let ports = self
            .components
            .iter()
            .zip(outlets)
            .filter_map(|(component, outlet)| {
                outlet.as_ref().map(|o| {
                    (
                        StateSnapshot::port_id(component.name()),
                        PortSnapshot::new(component, o),
                    )
                })
            })
            .collect();
        let thrust_n = self
            .components
            .iter()
            .map(|c| match c {
                Component::Nozzle(nozzle) => nozzle.thrust(),
                _ => 0.0,
            })
            .sum();
        StateSnapshot {
            index: self.index,
            time_s: self.time,
            thrust_n,
            ports,
        }
    }

    /// Step `steps` times, stopping at the first failure.
    pub fn run(&mut self, dt: f64, steps: usize) -> RunRecord {
        let mut snapshots = Vec::with_capacity(steps);
        for _ in 0..steps {
            match self.step(dt) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    return RunRecord {
                        snapshots,
                        stopped: Some(e),
                    };
                }
            }
        }
        RunRecord {
            snapshots,
            stopped: None,
        }
    }

    /// Finish the run. Further steps are rejected.
    pub fn complete(&mut self) -> EngineResult<()> {
        match (self.status, &self.halted_on) {
            (SystemStatus::Halted, Some(cause)) => Err(EngineError::Halted {
                cause: cause.clone(),
            }),
            _ => {
                if self.status != SystemStatus::Completed {
                    info!(steps = self.index, time = self.time, "run completed");
                }
                self.status = SystemStatus::Completed;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionDef;

    fn config(json: &str) -> EngineConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn dt_must_be_positive_and_finite() {
        assert!(check_dt(0.1).is_ok());
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(check_dt(dt), Err(EngineError::InvalidArg { .. })));
        }
    }

    #[test]
    fn topology_follows_connections() {
        let cfg = config(
            r#"{"components": [
                {"name": "line", "kind": "two_phase_pipe"},
                {"name": "pump", "kind": "pump"},
                {"name": "hx", "kind": "pressurizer_hx"}
            ], "connections": [
                {"from": "pump", "to": "line"},
                {"from": "pump", "to": "hx", "primary": false}
            ]}"#,
        );
        let topo = build_topology(&cfg).unwrap();
        let pump = topo.id("pump").unwrap();
        let line = topo.id("line").unwrap();
        assert_eq!(topo.primary_downstream(pump), Some(line));
        assert_eq!(topo.order().first(), Some(&pump));
    }

    #[test]
    fn unknown_connection_endpoint_is_a_topology_error() {
        let mut cfg = config(r#"{"components": [{"name": "pump", "kind": "pump"}]}"#);
        cfg.connections.push(ConnectionDef {
            from: "pump".to_string(),
            to: "nowhere".to_string(),
            primary: true,
        });
        let err = build_topology(&cfg).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Topology(TopologyError::NotFound { ref name }) if name == "nowhere"
        ));
    }
}
