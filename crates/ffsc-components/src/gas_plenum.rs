//! Non-reacting gas plenum (main chamber volume).

use ffsc_core::{GapReport, GapResult};
use ffsc_props::{Field, GapCollector, LoadResult, PropertyBundle};

use crate::common::CollectExt;
use crate::flow::InletConditions;
use crate::gas_volume::{
    GasVolumeParams, GasVolumeState, VolumeSources, advance_volume, initial_state, outlet_stream,
};
use crate::traits::{Advanced, ComponentModel};

#[derive(Debug, Clone)]
pub struct GasPlenum {
    name: String,
    volume: f64,
    heat_loss: f64,
    state: GasVolumeState,
}

impl GasPlenum {
    pub fn from_params(
        name: &str,
        params: &GasVolumeParams,
        props: &PropertyBundle,
    ) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, "engine");
        let init = params.read_init(&mut c);
        let heat_loss = read_heat_loss(params, &mut c);
        let volume = init.as_ref().map(|i| i.volume);
        let state = init.and_then(|i| c.take(initial_state(&props.gas, name, i)));
        let value = (|| {
            Some(Self {
                name: name.to_string(),
                volume: volume?,
                heat_loss: heat_loss?,
                state: state?,
            })
        })();
        c.finish(value)
    }

    /// Gaps of the parameters alone.
    pub fn check_params(name: &str, params: &GasVolumeParams) -> GapReport {
        let mut c = GapCollector::new(name, "engine");
        params.read_init(&mut c);
        read_heat_loss(params, &mut c);
        c.into_report()
    }
}

fn read_heat_loss(params: &GasVolumeParams, c: &mut GapCollector) -> Option<f64> {
    match params.heat_loss_w {
        Field::Absent => Some(0.0),
        ref f => c.number(f, "heat_loss_W"),
    }
}

impl ComponentModel for GasPlenum {
    type State = GasVolumeState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &GasVolumeState {
        &self.state
    }

    fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<GasVolumeState>> {
        let name = self.name.as_str();
        let demand = inlet.demand(name)?;
        let sources = VolumeSources {
            inflow: &inlet.streams,
            outflow: demand,
            heat_loss: self.heat_loss,
        };
        let (state, _) = advance_volume(
            &props.gas,
            name,
            self.volume,
            &self.state,
            dt,
            sources,
            None,
        )?;
        let outlet = outlet_stream(&props.gas, name, &state, demand)?;
        Ok(Advanced { outlet, state })
    }

    fn commit(&mut self, state: GasVolumeState) {
        self.state = state;
    }

    fn upstream_pressure(&self, _props: &PropertyBundle) -> GapResult<Option<f64>> {
        Ok(Some(self.state.p))
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![("mass_kg", self.state.mass)]
    }
}
