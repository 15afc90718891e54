//! Immutable bundle of every property table, loaded once and shared read-only.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ffsc_core::{GapReport, GapResult, MissingPropertyData};

use crate::cubic::CubicEos;
use crate::gas::GasMixtureThermo;
use crate::mbwr::MbwrCoefficients;
use crate::nasa7::Nasa7;
use crate::saturation::SaturationTable;
use crate::species::Species;
use crate::tables::{
    CubicEosTable, GapCollector, LoadResult, MbwrTable, Nasa7Table, SaturationTableRaw,
    TransportTable, load_json,
};
use crate::transport::Transport;
use crate::two_phase::TwoPhaseThermo;

/// Paths of the property tables.
#[derive(Debug, Clone)]
pub struct PropertyFiles {
    pub cubic_eos: PathBuf,
    pub nasa7: PathBuf,
    pub transport: PathBuf,
    pub saturation: PathBuf,
    /// mBWR-32 coefficient file per two-phase propellant.
    pub mbwr: BTreeMap<Species, PathBuf>,
}

/// Aggregation interfaces built from one consistent set of tables.
#[derive(Debug, Clone)]
pub struct PropertyBundle {
    pub gas: GasMixtureThermo,
    two_phase: BTreeMap<Species, TwoPhaseThermo>,
}

fn loaded<T>(result: GapResult<T>) -> LoadResult<T> {
    result.map_err(|gap| GapReport::from([gap]))
}

impl PropertyBundle {
    pub fn new(gas: GasMixtureThermo, two_phase: impl IntoIterator<Item = TwoPhaseThermo>) -> Self {
        Self {
            gas,
            two_phase: two_phase.into_iter().map(|tp| (tp.species(), tp)).collect(),
        }
    }

    /// Load and validate every table, collecting all gaps before failing.
    pub fn load(files: &PropertyFiles) -> LoadResult<Self> {
        let mut all = GapCollector::new("PropertyBundle", "property_tables");

        let cubic = all
            .absorb(loaded(load_json::<CubicEosTable>(
                &files.cubic_eos,
                "GasMixtureThermo",
                "cubic_eos",
            )))
            .and_then(|raw| all.absorb(CubicEos::from_table(&raw, "GasMixtureThermo")));
        let nasa = all
            .absorb(loaded(load_json::<Nasa7Table>(
                &files.nasa7,
                "GasMixtureThermo",
                "nasa7",
            )))
            .and_then(|raw| all.absorb(Nasa7::from_table(&raw, "GasMixtureThermo")));
        let transport = all
            .absorb(loaded(load_json::<TransportTable>(
                &files.transport,
                "GasMixtureThermo",
                "transport",
            )))
            .and_then(|raw| all.absorb(Transport::from_table(&raw, "GasMixtureThermo")));
        let saturation = all
            .absorb(loaded(load_json::<SaturationTableRaw>(
                &files.saturation,
                "TwoPhaseThermo",
                crate::saturation::TABLE,
            )))
            .and_then(|raw| all.absorb(SaturationTable::from_table(&raw, "TwoPhaseThermo")));

        let mut mbwr = BTreeMap::new();
        for (&species, path) in &files.mbwr {
            let owner = format!("TwoPhaseThermo[{species}]");
            let table = format!("{}_mbwr32", species.key().to_ascii_lowercase());
            let coeffs = all
                .absorb(loaded(load_json::<MbwrTable>(path, &owner, &table)))
                .and_then(|raw| {
                    all.absorb(MbwrCoefficients::from_table(&raw, species, &owner, &table))
                });
            if let Some(coeffs) = coeffs {
                mbwr.insert(species, coeffs);
            }
        }

        let (Some(cubic), Some(nasa), Some(transport), Some(saturation)) =
            (cubic, nasa, transport, saturation)
        else {
            return all.finish(None);
        };

        let mut two_phase = Vec::new();
        for (&species, coeffs) in &mbwr {
            let owner = format!("TwoPhaseThermo[{species}]");
            let curve = saturation.curve(species).map_err(|g| g.attributed_to(&owner));
            let ideal = nasa.species(species).map_err(|g| g.attributed_to(&owner));
            match (curve, ideal) {
                (Ok(curve), Ok(ideal)) => two_phase.push(TwoPhaseThermo::new(
                    curve.clone(),
                    coeffs.clone(),
                    ideal.clone(),
                )),
                (curve, ideal) => {
                    for gap in [curve.err(), ideal.err()].into_iter().flatten() {
                        all.record(gap);
                    }
                }
            }
        }

        all.finish(Some(Self::new(
            GasMixtureThermo::new(cubic, nasa, transport),
            two_phase,
        )))
    }

    /// Two-phase surface of one propellant.
    pub fn two_phase(&self, species: Species) -> GapResult<&TwoPhaseThermo> {
        self.two_phase.get(&species).ok_or_else(|| {
            MissingPropertyData::absent(
                "PropertyBundle",
                format!("{}_mbwr32", species.key().to_ascii_lowercase()),
                species.key(),
            )
        })
    }
}
