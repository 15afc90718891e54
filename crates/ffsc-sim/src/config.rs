//! Table layout and the engine definition document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ffsc_components::ComponentDef;
use ffsc_props::{Metadata, PropertyFiles, Species};
use serde::Deserialize;

/// Key of `system/engine.json` in the layout.
pub const ENGINE_TABLE: &str = "engine";

/// Propellants with a two-phase surface.
pub const PROPELLANTS: [Species; 2] = [Species::CH4, Species::O2];

/// Default location of every table relative to the data root.
const LAYOUT: [(&str, &str); 12] = [
    ("cubic_eos", "props/cubic_eos.json"),
    ("nasa7", "props/nasa7.json"),
    ("transport", "props/transport.json"),
    ("ch4_mbwr32", "props/mbwr/ch4_mbwr32.json"),
    ("o2_mbwr32", "props/mbwr/o2_mbwr32.json"),
    ("saturation_table", "saturation/saturation_table.json"),
    ("fuel_pump", "turbopump/fuel_pump.json"),
    ("ox_pump", "turbopump/ox_pump.json"),
    ("equilibrium", "preburner/equilibrium.json"),
    ("nozzle", "nozzle/nozzle.json"),
    ("pressurizer_hx", "pressurizer/pressurizer_hx.json"),
    (ENGINE_TABLE, "system/engine.json"),
];

/// mBWR table key of a propellant, e.g. `ch4_mbwr32`.
pub fn mbwr_key(species: Species) -> String {
    format!("{}_mbwr32", species.key().to_ascii_lowercase())
}

/// Where each table lives: a root directory with the default layout, plus
/// per-table overrides.
#[derive(Debug, Clone)]
pub struct TablePaths {
    root: PathBuf,
    overrides: BTreeMap<String, PathBuf>,
}

impl TablePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// Point one table key at another file.
    pub fn with_override(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(key.into(), path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys of the default layout.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        LAYOUT.iter().map(|(key, _)| *key)
    }

    /// Resolved file of a table key; `None` for a key outside the layout
    /// without an override.
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        if let Some(path) = self.overrides.get(key) {
            return Some(path.clone());
        }
        LAYOUT
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, rel)| self.root.join(rel))
    }

    fn layout_path(&self, key: &str) -> PathBuf {
        self.resolve(key).unwrap_or_else(|| self.root.join(key))
    }

    pub fn engine(&self) -> PathBuf {
        self.layout_path(ENGINE_TABLE)
    }

    /// Files of the property bundle.
    pub fn property_files(&self) -> PropertyFiles {
        PropertyFiles {
            cubic_eos: self.layout_path("cubic_eos"),
            nasa7: self.layout_path("nasa7"),
            transport: self.layout_path("transport"),
            saturation: self.layout_path(ffsc_props::saturation::TABLE),
            mbwr: PROPELLANTS
                .iter()
                .map(|&sp| (sp, self.layout_path(&mbwr_key(sp))))
                .collect(),
        }
    }
}

fn primary_default() -> bool {
    true
}

/// One entry of `connections` in `system/engine.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
    /// `false` marks a side tap.
    #[serde(default = "primary_default")]
    pub primary: bool,
}

/// `system/engine.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub metadata: Metadata,
    pub components: Vec<ComponentDef>,
    pub connections: Vec<ConnectionDef>,
}
