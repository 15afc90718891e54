//! Parallel property sweeps over temperature grids.

use ffsc_core::units::{Pressure, k};
use ffsc_core::GapResult;
use rayon::prelude::*;

use crate::composition::Composition;
use crate::gas::{GasMixtureThermo, ThermoState};

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// One sweep point: the temperature and its state or the gap that blocked it.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    pub t: f64,
    pub state: GapResult<ThermoState>,
}

/// Evaluate the gas surface at fixed pressure over a temperature grid.
///
/// Points are computed in parallel and returned in grid order.
pub fn temperature_sweep(
    gas: &GasMixtureThermo,
    p: Pressure,
    temperatures: &[f64],
    comp: &Composition,
) -> Vec<SweepPoint> {
    temperatures
        .par_iter()
        .map(|&t| SweepPoint {
            t,
            state: gas.state(p, k(t), comp),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::fixtures::gas;
    use crate::species::Species;
    use ffsc_core::pa;

    #[test]
    fn linspace_endpoints() {
        let pts = linspace(300.0, 600.0, 4);
        assert_eq!(pts, vec![300.0, 400.0, 500.0, 600.0]);
        assert!(linspace(1.0, 2.0, 0).is_empty());
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
    }

    #[test]
    fn parallel_sweep_matches_serial_queries() {
        let g = gas();
        let comp = Composition::pure(Species::O2);
        let temps = linspace(250.0, 3000.0, 64);
        let points = temperature_sweep(&g, pa(1e6), &temps, &comp);
        assert_eq!(points.len(), temps.len());
        for (pt, &t) in points.iter().zip(&temps) {
            assert_eq!(pt.t, t);
            let serial = g.state(pa(1e6), k(t), &comp).unwrap();
            assert_eq!(pt.state.as_ref().unwrap(), &serial);
        }
    }

    #[test]
    fn out_of_range_points_carry_their_gap() {
        let g = gas();
        let comp = Composition::pure(Species::CH4);
        let points = temperature_sweep(&g, pa(1e5), &[150.0, 300.0, 4000.0], &comp);
        assert!(points[0].state.is_err());
        assert!(points[1].state.is_ok());
        assert!(points[2].state.as_ref().unwrap_err().is_out_of_range());
    }
}
