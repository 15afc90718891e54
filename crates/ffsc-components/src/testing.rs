//! Demo property tables shared by the unit tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use ffsc_props::{PropertyBundle, PropertyFiles, Species};

pub fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/demo")
}

pub fn props() -> &'static PropertyBundle {
    static PROPS: OnceLock<PropertyBundle> = OnceLock::new();
    PROPS.get_or_init(|| {
        let root = demo_dir().join("props");
        let files = PropertyFiles {
            cubic_eos: root.join("cubic_eos.json"),
            nasa7: root.join("nasa7.json"),
            transport: root.join("transport.json"),
            saturation: demo_dir().join("saturation/saturation_table.json"),
            mbwr: BTreeMap::from([
                (Species::CH4, root.join("mbwr/ch4_mbwr32.json")),
                (Species::O2, root.join("mbwr/o2_mbwr32.json")),
            ]),
        };
        PropertyBundle::load(&files).expect("demo tables load")
    })
}
