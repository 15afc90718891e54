//! The closed set of component kinds and their construction from engine definitions.

use std::path::Path;

use ffsc_core::{GapReport, GapResult, MissingPropertyData};
use ffsc_props::{LoadResult, PropertyBundle, load_json};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::flow::{FlowState, InletConditions};
use crate::gas_pipe::{GasPipe, GasPipeParams, GasPipeState};
use crate::gas_plenum::GasPlenum;
use crate::gas_volume::{GasVolumeParams, GasVolumeState};
use crate::nozzle::{Nozzle, NozzleParams, NozzleState, NozzleTable};
use crate::preburner::{EquilibriumTableRaw, Preburner, PreburnerState};
use crate::pressurizer::{Pressurizer, PressurizerParams, PressurizerState, PressurizerTable};
use crate::pump::{Pump, PumpParams, PumpState, PumpTable};
use crate::traits::{Advanced, ComponentModel};
use crate::two_phase_pipe::{TwoPhasePipe, TwoPhasePipeParams, TwoPhasePipeState};
use crate::two_phase_plenum::{TwoPhasePlenum, TwoPhasePlenumParams, TwoPhasePlenumState};
use crate::two_phase_valve::{TwoPhaseValve, ValveParams, ValveState};

const ENGINE: &str = "engine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Pump,
    TwoPhasePipe,
    TwoPhasePlenum,
    TwoPhaseValve,
    Preburner,
    GasPipe,
    GasPlenum,
    Nozzle,
    PressurizerHx,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Pump => "pump",
            ComponentKind::TwoPhasePipe => "two_phase_pipe",
            ComponentKind::TwoPhasePlenum => "two_phase_plenum",
            ComponentKind::TwoPhaseValve => "two_phase_valve",
            ComponentKind::Preburner => "preburner",
            ComponentKind::GasPipe => "gas_pipe",
            ComponentKind::GasPlenum => "gas_plenum",
            ComponentKind::Nozzle => "nozzle",
            ComponentKind::PressurizerHx => "pressurizer_hx",
        }
    }

    /// Whether the kind reads a coefficient table besides its engine parameters.
    pub fn needs_table(&self) -> bool {
        matches!(
            self,
            ComponentKind::Pump
                | ComponentKind::Preburner
                | ComponentKind::Nozzle
                | ComponentKind::PressurizerHx
        )
    }
}

/// One entry of `components` in `system/engine.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentDef {
    pub name: String,
    pub kind: ComponentKind,
    /// Key of the coefficient table in the table layout.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ComponentDef {
    fn params<P: DeserializeOwned>(&self) -> GapResult<P> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone())).map_err(|e| {
            MissingPropertyData::malformed(&self.name, ENGINE, "params", e.to_string())
        })
    }

    /// Read this component's coefficient table.
    fn table<T: DeserializeOwned>(&self, path: Option<&Path>) -> GapResult<(String, T)> {
        let key = self
            .table
            .as_deref()
            .ok_or_else(|| MissingPropertyData::absent(&self.name, ENGINE, "table"))?;
        let path = path.ok_or_else(|| MissingPropertyData::absent(&self.name, key, "path"))?;
        let doc = load_json(path, &self.name, key)?;
        Ok((key.to_string(), doc))
    }
}

fn single<T>(r: GapResult<T>) -> LoadResult<T> {
    r.map_err(|gap| GapReport::from([gap]))
}

/// Parameters and table together, reporting the gaps of both.
fn both<P, T>(params: GapResult<P>, table: GapResult<T>) -> LoadResult<(P, T)> {
    match (params, table) {
        (Ok(p), Ok(t)) => Ok((p, t)),
        (p, t) => Err(p.err().into_iter().chain(t.err()).collect()),
    }
}

fn clean(report: GapReport) -> LoadResult<()> {
    if report.is_empty() { Ok(()) } else { Err(report) }
}

/// A component of the engine network.
#[derive(Debug, Clone)]
pub enum Component {
    Pump(Pump),
    TwoPhasePipe(TwoPhasePipe),
    TwoPhasePlenum(TwoPhasePlenum),
    TwoPhaseValve(TwoPhaseValve),
    Preburner(Preburner),
    GasPipe(GasPipe),
    GasPlenum(GasPlenum),
    Nozzle(Nozzle),
    Pressurizer(Pressurizer),
}

/// An advanced but not yet committed component state.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingState {
    Pump(PumpState),
    TwoPhasePipe(TwoPhasePipeState),
    TwoPhasePlenum(TwoPhasePlenumState),
    TwoPhaseValve(ValveState),
    Preburner(PreburnerState),
    GasPipe(GasPipeState),
    GasPlenum(GasVolumeState),
    Nozzle(NozzleState),
    Pressurizer(PressurizerState),
}

macro_rules! each_kind {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Component::Pump($inner) => $body,
            Component::TwoPhasePipe($inner) => $body,
            Component::TwoPhasePlenum($inner) => $body,
            Component::TwoPhaseValve($inner) => $body,
            Component::Preburner($inner) => $body,
            Component::GasPipe($inner) => $body,
            Component::GasPlenum($inner) => $body,
            Component::Nozzle($inner) => $body,
            Component::Pressurizer($inner) => $body,
        }
    };
}

macro_rules! advance_as {
    ($variant:ident, $model:expr, $dt:expr, $inlet:expr, $props:expr) => {{
        let Advanced { outlet, state } = $model.advance($dt, $inlet, $props)?;
        Ok((outlet, PendingState::$variant(state)))
    }};
}

impl Component {
    /// Build from an engine definition. `table_path` is the resolved file of
    /// `def.table`, if any.
    pub fn from_def(
        def: &ComponentDef,
        table_path: Option<&Path>,
        props: &PropertyBundle,
    ) -> LoadResult<Self> {
        let name = def.name.as_str();
        match def.kind {
            ComponentKind::Pump => {
                let (params, (key, table)): (PumpParams, (String, PumpTable)) =
                    both(def.params(), def.table(table_path))?;
                Pump::from_tables(name, &params, &key, &table).map(Component::Pump)
            }
            ComponentKind::TwoPhasePipe => {
                let params: TwoPhasePipeParams = single(def.params())?;
                TwoPhasePipe::from_params(name, &params).map(Component::TwoPhasePipe)
            }
            ComponentKind::TwoPhasePlenum => {
                let params: TwoPhasePlenumParams = single(def.params())?;
                TwoPhasePlenum::from_params(name, &params).map(Component::TwoPhasePlenum)
            }
            ComponentKind::TwoPhaseValve => {
                let params: ValveParams = single(def.params())?;
                TwoPhaseValve::from_params(name, &params).map(Component::TwoPhaseValve)
            }
            ComponentKind::Preburner => {
                let (params, (key, table)): (GasVolumeParams, (String, EquilibriumTableRaw)) =
                    both(def.params(), def.table(table_path))?;
                Preburner::from_tables(name, &params, &key, &table, props).map(Component::Preburner)
            }
            ComponentKind::GasPipe => {
                let params: GasPipeParams = single(def.params())?;
                GasPipe::from_params(name, &params).map(Component::GasPipe)
            }
            ComponentKind::GasPlenum => {
                let params: GasVolumeParams = single(def.params())?;
                GasPlenum::from_params(name, &params, props).map(Component::GasPlenum)
            }
            ComponentKind::Nozzle => {
                let (params, (key, table)): (NozzleParams, (String, NozzleTable)) =
                    both(def.params(), def.table(table_path))?;
                Nozzle::from_tables(name, &params, &key, &table).map(Component::Nozzle)
            }
            ComponentKind::PressurizerHx => {
                let (params, (key, table)): (PressurizerParams, (String, PressurizerTable)) =
                    both(def.params(), def.table(table_path))?;
                Pressurizer::from_tables(name, &params, &key, &table).map(Component::Pressurizer)
            }
        }
    }

    /// Gaps of a definition that show without the property tables: its
    /// params, its coefficient table and whatever is built from those alone.
    pub fn check_def(def: &ComponentDef, table_path: Option<&Path>) -> GapReport {
        let name = def.name.as_str();
        let outcome: LoadResult<()> = match def.kind {
            ComponentKind::Pump => both(def.params::<PumpParams>(), def.table::<PumpTable>(table_path))
                .and_then(|(params, (key, table))| Pump::from_tables(name, &params, &key, &table).map(drop)),
            ComponentKind::TwoPhasePipe => single(def.params::<TwoPhasePipeParams>())
                .and_then(|params| TwoPhasePipe::from_params(name, &params).map(drop)),
            ComponentKind::TwoPhasePlenum => single(def.params::<TwoPhasePlenumParams>())
                .and_then(|params| TwoPhasePlenum::from_params(name, &params).map(drop)),
            ComponentKind::TwoPhaseValve => single(def.params::<ValveParams>())
                .and_then(|params| TwoPhaseValve::from_params(name, &params).map(drop)),
            ComponentKind::Preburner => both(
                def.params::<GasVolumeParams>(),
                def.table::<EquilibriumTableRaw>(table_path),
            )
            .and_then(|(params, (key, table))| {
                clean(Preburner::check_tables(name, &params, &key, &table))
            }),
            ComponentKind::GasPipe => single(def.params::<GasPipeParams>())
                .and_then(|params| GasPipe::from_params(name, &params).map(drop)),
            ComponentKind::GasPlenum => single(def.params::<GasVolumeParams>())
                .and_then(|params| clean(GasPlenum::check_params(name, &params))),
            ComponentKind::Nozzle => both(def.params::<NozzleParams>(), def.table::<NozzleTable>(table_path))
                .and_then(|(params, (key, table))| Nozzle::from_tables(name, &params, &key, &table).map(drop)),
            ComponentKind::PressurizerHx => both(
                def.params::<PressurizerParams>(),
                def.table::<PressurizerTable>(table_path),
            )
            .and_then(|(params, (key, table))| {
                Pressurizer::from_tables(name, &params, &key, &table).map(drop)
            }),
        };
        outcome.err().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        each_kind!(self, c => c.name())
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Pump(_) => ComponentKind::Pump,
            Component::TwoPhasePipe(_) => ComponentKind::TwoPhasePipe,
            Component::TwoPhasePlenum(_) => ComponentKind::TwoPhasePlenum,
            Component::TwoPhaseValve(_) => ComponentKind::TwoPhaseValve,
            Component::Preburner(_) => ComponentKind::Preburner,
            Component::GasPipe(_) => ComponentKind::GasPipe,
            Component::GasPlenum(_) => ComponentKind::GasPlenum,
            Component::Nozzle(_) => ComponentKind::Nozzle,
            Component::Pressurizer(_) => ComponentKind::PressurizerHx,
        }
    }

    /// Advance without committing.
    pub fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<(FlowState, PendingState)> {
        match self {
            Component::Pump(c) => advance_as!(Pump, c, dt, inlet, props),
            Component::TwoPhasePipe(c) => advance_as!(TwoPhasePipe, c, dt, inlet, props),
            Component::TwoPhasePlenum(c) => advance_as!(TwoPhasePlenum, c, dt, inlet, props),
            Component::TwoPhaseValve(c) => advance_as!(TwoPhaseValve, c, dt, inlet, props),
            Component::Preburner(c) => advance_as!(Preburner, c, dt, inlet, props),
            Component::GasPipe(c) => advance_as!(GasPipe, c, dt, inlet, props),
            Component::GasPlenum(c) => advance_as!(GasPlenum, c, dt, inlet, props),
            Component::Nozzle(c) => advance_as!(Nozzle, c, dt, inlet, props),
            Component::Pressurizer(c) => advance_as!(Pressurizer, c, dt, inlet, props),
        }
    }

    /// Commit a state produced by [`Component::advance`] on this component.
    pub fn commit(&mut self, pending: PendingState) {
        match (self, pending) {
            (Component::Pump(c), PendingState::Pump(s)) => c.commit(s),
            (Component::TwoPhasePipe(c), PendingState::TwoPhasePipe(s)) => c.commit(s),
            (Component::TwoPhasePlenum(c), PendingState::TwoPhasePlenum(s)) => c.commit(s),
            (Component::TwoPhaseValve(c), PendingState::TwoPhaseValve(s)) => c.commit(s),
            (Component::Preburner(c), PendingState::Preburner(s)) => c.commit(s),
            (Component::GasPipe(c), PendingState::GasPipe(s)) => c.commit(s),
            (Component::GasPlenum(c), PendingState::GasPlenum(s)) => c.commit(s),
            (Component::Nozzle(c), PendingState::Nozzle(s)) => c.commit(s),
            (Component::Pressurizer(c), PendingState::Pressurizer(s)) => c.commit(s),
            (c, _) => warn!(component = c.name(), "state of another kind ignored"),
        }
    }

    pub fn upstream_pressure(&self, props: &PropertyBundle) -> GapResult<Option<f64>> {
        each_kind!(self, c => c.upstream_pressure(props))
    }

    pub fn demand(&self) -> Option<f64> {
        each_kind!(self, c => c.demand())
    }

    pub fn derived(&self) -> Vec<(&'static str, f64)> {
        each_kind!(self, c => c.derived())
    }
}
