//! Gap reporting against edited copies of the demo tables.

use std::fs;
use std::path::{Path, PathBuf};

use ffsc_core::GapKind;
use ffsc_sim::{EngineError, EngineSystem, SystemStatus, TablePaths};
use serde_json::Value;

fn demo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/demo")
}

fn read(rel: &str) -> Value {
    let text = fs::read_to_string(demo_root().join(rel)).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Write `doc` under a per-test temp directory and return its path.
fn write_temp(test: &str, file: &str, doc: &Value) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ffsc-sim-{test}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    path
}

fn cleanup(path: &Path) {
    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

fn restricted_saturation() -> Value {
    let mut doc = read("saturation/saturation_table.json");
    let rows = doc["species"]["CH4"].as_array_mut().unwrap();
    rows.retain(|row| {
        let t = row["T_K"].as_f64().unwrap();
        (100.0..=120.0).contains(&t)
    });
    assert_eq!(rows.len(), 11);
    doc
}

#[test]
fn restricted_saturation_table_reports_one_gap() {
    let path = write_temp("restricted", "saturation_table.json", &restricted_saturation());
    let paths = TablePaths::new(demo_root()).with_override("saturation_table", &path);
    let mut engine = EngineSystem::build_from_files(&paths).unwrap();
    let before = engine.clone();

    let report = engine.missing_data();
    assert_eq!(report.len(), 1, "{report:#?}");
    let gap = report.iter().next().unwrap();
    assert_eq!(gap.owner, "fuel_manifold");
    assert_eq!(gap.table, "saturation_table[CH4]");
    assert_eq!(gap.field, "T");
    assert_eq!(
        gap.kind,
        GapKind::OutOfRange {
            value: 165.0,
            min: Some(100.0),
            max: Some(120.0),
        }
    );
    assert_eq!(engine.missing_data(), report);

    // The step fails on the same gap and commits nothing.
    match engine.step(0.1) {
        Err(EngineError::MissingData(first)) => assert!(report.contains(&first)),
        other => panic!("expected a missing-data failure, got {other:?}"),
    }
    assert_eq!(engine.status(), SystemStatus::Halted);
    assert_eq!(engine.index(), 0);
    assert_eq!(engine.time(), 0.0);
    // Components that advanced before the failure kept their committed state.
    for (after, prior) in engine.components().zip(before.components()) {
        assert_eq!(after.name(), prior.name());
        assert_eq!(after.derived(), prior.derived(), "{}", after.name());
        assert_eq!(after.demand(), prior.demand(), "{}", after.name());
        assert_eq!(format!("{after:?}"), format!("{prior:?}"));
    }
    assert!(matches!(engine.step(0.1), Err(EngineError::Halted { .. })));
    assert!(engine.complete().is_err());
    cleanup(&path);
}

#[test]
fn null_mbwr_coefficients_fail_assembly() {
    let mut doc = read("props/mbwr/ch4_mbwr32.json");
    doc["b"]["b7"] = Value::Null;
    doc["rho_c_mol_per_L"] = Value::Null;
    let path = write_temp("mbwr-null", "ch4_mbwr32.json", &doc);
    let paths = TablePaths::new(demo_root()).with_override("ch4_mbwr32", &path);

    let err = EngineSystem::build_from_files(&paths).unwrap_err();
    let EngineError::Assembly(report) = err else {
        panic!("expected an assembly failure, got {err:?}");
    };
    let fields: Vec<(&str, &str, &GapKind)> = report
        .iter()
        .map(|g| (g.table.as_str(), g.field.as_str(), &g.kind))
        .collect();
    assert!(fields.contains(&("ch4_mbwr32", "b7", &GapKind::Null)));
    assert!(fields.contains(&("ch4_mbwr32", "rho_c_mol_per_L", &GapKind::Null)));
    cleanup(&path);
}

#[test]
fn gaps_from_several_tables_are_reported_together() {
    let mut nozzle = read("nozzle/nozzle.json");
    nozzle
        .as_object_mut()
        .unwrap()
        .remove("discharge_coefficient");
    let nozzle_path = write_temp("several", "nozzle.json", &nozzle);

    let mut equilibrium = read("preburner/equilibrium.json");
    equilibrium["rows"][4]["chemical_time_s"] = Value::Null;
    let equilibrium_path = nozzle_path.with_file_name("equilibrium.json");
    fs::write(&equilibrium_path, serde_json::to_string(&equilibrium).unwrap()).unwrap();

    let paths = TablePaths::new(demo_root())
        .with_override("nozzle", &nozzle_path)
        .with_override("equilibrium", &equilibrium_path);
    let report = EngineSystem::build_from_files(&paths).unwrap_err().gaps();
    assert_eq!(report.len(), 2, "{report:#?}");
    assert!(report.iter().any(|g| g.owner == "nozzle"
        && g.field == "discharge_coefficient"
        && g.kind == GapKind::Absent));
    assert!(report.iter().any(|g| g.owner == "preburner"
        && g.table == "equilibrium"
        && g.kind == GapKind::Null));
    cleanup(&nozzle_path);
}

#[test]
fn bad_property_table_is_reported() {
    let mut nasa = read("props/nasa7.json");
    nasa["species"]["CO2"]["high"][3] = Value::Null;
    let path = write_temp("nasa-null", "nasa7.json", &nasa);
    let paths = TablePaths::new(demo_root()).with_override("nasa7", &path);
    let report = EngineSystem::build_from_files(&paths).unwrap_err().gaps();
    assert!(
        report
            .iter()
            .any(|g| g.table == "nasa7" && g.kind == GapKind::Null),
        "{report:#?}"
    );
    cleanup(&path);
}

#[test]
fn component_tables_are_checked_when_property_tables_fail() {
    let dir = std::env::temp_dir().join(format!("ffsc-sim-two-absent-{}", std::process::id()));
    let paths = TablePaths::new(demo_root())
        .with_override("saturation_table", dir.join("saturation_table.json"))
        .with_override("fuel_pump", dir.join("fuel_pump.json"));
    let report = EngineSystem::build_from_files(&paths).unwrap_err().gaps();
    assert!(
        report
            .iter()
            .any(|g| g.table == "saturation_table" && g.kind == GapKind::Absent),
        "{report:#?}"
    );
    assert!(
        report
            .iter()
            .any(|g| g.owner == "fuel_pump" && g.table == "fuel_pump" && g.kind == GapKind::Absent),
        "{report:#?}"
    );
    assert!(report.iter().all(|g| g.owner != "ox_pump"));
}

#[test]
fn null_engine_params_are_reported_with_property_gaps() {
    let mut nasa = read("props/nasa7.json");
    nasa["species"]["CO2"]["high"][3] = Value::Null;
    let nasa_path = write_temp("nasa-and-engine", "nasa7.json", &nasa);

    let mut engine = read("system/engine.json");
    for def in engine["components"].as_array_mut().unwrap() {
        if def["name"] == "main_chamber" {
            def["params"]["volume_m3"] = Value::Null;
        }
    }
    let engine_path = nasa_path.with_file_name("engine.json");
    fs::write(&engine_path, serde_json::to_string(&engine).unwrap()).unwrap();

    let paths = TablePaths::new(demo_root())
        .with_override("nasa7", &nasa_path)
        .with_override("engine", &engine_path);
    let report = EngineSystem::build_from_files(&paths).unwrap_err().gaps();
    assert!(report.iter().any(|g| g.table == "nasa7"), "{report:#?}");
    assert!(
        report.iter().any(|g| g.owner == "main_chamber"
            && g.field == "volume_m3"
            && g.kind == GapKind::Null),
        "{report:#?}"
    );
    cleanup(&nasa_path);
}

#[test]
fn missing_component_table_is_absent() {
    let paths = TablePaths::new(demo_root()).with_override(
        "pressurizer_hx",
        std::env::temp_dir().join("ffsc-sim-no-such-pressurizer.json"),
    );
    let err = EngineSystem::build_from_files(&paths).unwrap_err();
    let report = err.gaps();
    assert_eq!(report.len(), 1, "{report:#?}");
    let gap = report.iter().next().unwrap();
    assert_eq!(gap.owner, "pressurizer");
    assert_eq!(gap.table, "pressurizer_hx");
    assert_eq!(gap.kind, GapKind::Absent);
}

#[test]
fn unknown_connection_is_a_topology_error() {
    let mut engine = read("system/engine.json");
    engine["connections"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({"from": "nozzle", "to": "aft_skirt"}));
    let path = write_temp("topology", "engine.json", &engine);
    let paths = TablePaths::new(demo_root()).with_override("engine", &path);
    assert!(matches!(
        EngineSystem::build_from_files(&paths),
        Err(EngineError::Topology(_))
    ));
    cleanup(&path);
}
