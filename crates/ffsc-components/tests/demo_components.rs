//! Components built from the demo engine definition and advanced on the demo tables.

use std::path::PathBuf;
use std::sync::OnceLock;

use ffsc_components::{Component, ComponentDef, ComponentKind, FlowState, InletConditions, Phase};
use ffsc_props::{Composition, PropertyBundle, PropertyFiles, Species};

fn demo(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data/demo")
        .join(rel)
}

fn props() -> &'static PropertyBundle {
    static PROPS: OnceLock<PropertyBundle> = OnceLock::new();
    PROPS.get_or_init(|| {
        let files = PropertyFiles {
            cubic_eos: demo("props/cubic_eos.json"),
            nasa7: demo("props/nasa7.json"),
            transport: demo("props/transport.json"),
            saturation: demo("saturation/saturation_table.json"),
            mbwr: [
                (Species::CH4, demo("props/mbwr/ch4_mbwr32.json")),
                (Species::O2, demo("props/mbwr/o2_mbwr32.json")),
            ]
            .into_iter()
            .collect(),
        };
        PropertyBundle::load(&files).unwrap()
    })
}

fn table_file(key: &str) -> Option<PathBuf> {
    let rel = match key {
        "fuel_pump" => "turbopump/fuel_pump.json",
        "ox_pump" => "turbopump/ox_pump.json",
        "equilibrium" => "preburner/equilibrium.json",
        "nozzle" => "nozzle/nozzle.json",
        "pressurizer_hx" => "pressurizer/pressurizer_hx.json",
        _ => return None,
    };
    Some(demo(rel))
}

fn defs() -> Vec<ComponentDef> {
    let text = std::fs::read_to_string(demo("system/engine.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    serde_json::from_value(doc["components"].clone()).unwrap()
}

fn build(name: &str) -> Component {
    let def = defs().into_iter().find(|d| d.name == name).unwrap();
    let path = def.table.as_deref().and_then(table_file);
    Component::from_def(&def, path.as_deref(), props()).unwrap()
}

fn products() -> Composition {
    Composition::from_mass_fractions(vec![
        (Species::CH4, 0.75),
        (Species::CO2, 0.1375),
        (Species::H2O, 0.1125),
    ])
    .unwrap()
}

fn pump_discharge() -> FlowState {
    let pump = build("fuel_pump");
    let inlet = InletConditions::new(Vec::new()).with_back_pressure(2.0e6);
    pump.advance(0.1, &inlet, props()).unwrap().0
}

#[test]
fn every_demo_component_builds() {
    let defs = defs();
    assert_eq!(defs.len(), 13);
    for def in &defs {
        let path = def.table.as_deref().and_then(table_file);
        assert_eq!(def.kind.needs_table(), path.is_some(), "{}", def.name);
        let component = Component::from_def(def, path.as_deref(), props()).unwrap();
        assert_eq!(component.name(), def.name);
        assert_eq!(component.kind(), def.kind);
    }
}

#[test]
fn pump_raises_pressure_and_heats_liquid() {
    let mut pump = build("fuel_pump");
    let inlet = InletConditions::new(Vec::new()).with_back_pressure(2.0e6);
    let (outlet, pending) = pump.advance(0.1, &inlet, props()).unwrap();
    assert_eq!(outlet.phase, Phase::Liquid);
    assert_eq!(outlet.composition.is_pure(), Some(Species::CH4));
    assert!(outlet.p_pa() > 3.0e5);
    assert!(outlet.t_k() > 112.0 && outlet.t_k() < 130.0);
    assert!(outlet.mdot_kg_s() > 0.0);

    pump.commit(pending);
    let derived: std::collections::BTreeMap<_, _> = pump.derived().into_iter().collect();
    assert!(derived["shaft_power_W"] > 0.0);
    assert!(derived["efficiency"] > 0.0 && derived["efficiency"] <= 1.0);
    assert_eq!(pump.demand(), Some(outlet.mdot_kg_s()));
}

#[test]
fn injector_flow_follows_pressure_ratio() {
    let injector = build("fuel_injector");
    let manifold = build("fuel_manifold");
    let p_manifold = manifold.upstream_pressure(props()).unwrap().unwrap();
    let stream = FlowState::new(
        0.4,
        p_manifold,
        165.0,
        0.0,
        200.0,
        Composition::pure(Species::CH4),
        Phase::TwoPhase { quality: 0.07 },
    );

    let flow = |back: f64| {
        let inlet = InletConditions::new(vec![stream.clone()]).with_back_pressure(back);
        injector.advance(0.1, &inlet, props()).unwrap().0.mdot_kg_s()
    };
    let low = flow(0.9 * p_manifold);
    let high = flow(0.6 * p_manifold);
    assert!(low > 0.0 && high > low);
    assert_eq!(flow(1.1 * p_manifold), 0.0);
}

#[test]
fn pressurizer_warms_the_cold_bleed() {
    let mut hx = build("pressurizer");
    let hot = FlowState::new(0.5, 0.8e6, 850.0, 0.0, 2.0, products(), Phase::Gas);
    let cold = pump_discharge();
    let inlet = InletConditions::new(vec![hot, cold.clone()]);
    let (outlet, pending) = hx.advance(0.1, &inlet, props()).unwrap();
    assert_eq!(outlet.phase, Phase::Gas);
    assert!((outlet.mdot_kg_s() - 0.013 * cold.mdot_kg_s()).abs() < 1e-12);
    assert!(outlet.t_k() > cold.t_k());

    hx.commit(pending);
    let derived: std::collections::BTreeMap<_, _> = hx.derived().into_iter().collect();
    let wall = derived["wall_temperature_K"];
    assert!(wall > cold.t_k() && wall < 850.0);
    assert!(derived["heat_hot_W"] > 0.0);
}

#[test]
fn pressurizer_needs_both_taps() {
    let hx = build("pressurizer");
    let inlet = InletConditions::new(vec![pump_discharge()]);
    let gap = hx.advance(0.1, &inlet, props()).unwrap_err();
    assert_eq!(gap.owner, "pressurizer");
    assert_eq!(gap.table, "topology");
}

#[test]
fn nozzle_thrust_from_chamber_stream() {
    let nozzle = build("nozzle");
    assert_eq!(nozzle.kind(), ComponentKind::Nozzle);
    let chamber = FlowState::new(0.5, 0.8e6, 850.0, 0.0, 2.0, products(), Phase::Gas);
    let inlet = InletConditions::new(vec![chamber]);
    let (outlet, _) = nozzle.advance(0.1, &inlet, props()).unwrap();
    assert!(outlet.mdot_kg_s() > 0.0);
    assert_eq!(outlet.p_pa(), 0.08e6);
    assert!(outlet.t_k() < 850.0);

    let exit = props()
        .gas
        .state(ffsc_core::pa(0.08e6), ffsc_core::k(outlet.t_k()), &products())
        .unwrap();
    assert_eq!(outlet.rho, exit.rho.value);
}
