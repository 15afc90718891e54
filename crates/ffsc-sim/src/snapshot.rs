//! Per-step view of the network returned by a successful step.

use std::collections::BTreeMap;

use ffsc_components::{Component, FlowState};
use serde::Serialize;

/// Outlet port of one component after a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortSnapshot {
    pub component: String,
    pub kind: &'static str,
    pub mdot_kg_s: f64,
    #[serde(rename = "p_Pa")]
    pub p_pa: f64,
    #[serde(rename = "T_K")]
    pub t_k: f64,
    /// Vapor mass fraction of the outlet stream.
    pub quality: f64,
    /// Component estimates such as thrust, heat flows or pressure drops.
    pub derived: BTreeMap<String, f64>,
}

impl PortSnapshot {
    pub(crate) fn new(component: &Component, outlet: &FlowState) -> Self {
        Self {
            component: component.name().to_string(),
            kind: component.kind().as_str(),
            mdot_kg_s: outlet.mdot_kg_s(),
            p_pa: outlet.p_pa(),
            t_k: outlet.t_k(),
            quality: outlet.phase.quality(),
            derived: component
                .derived()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// State of the whole network after step `index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// 1-based count of committed steps.
    pub index: u64,
    pub time_s: f64,
    /// Summed nozzle thrust [N].
    #[serde(rename = "thrust_N")]
    pub thrust_n: f64,
    /// Keyed by port identifier `<component>.out`.
    pub ports: BTreeMap<String, PortSnapshot>,
}

impl StateSnapshot {
    pub fn port_id(component: &str) -> String {
        format!("{component}.out")
    }

    /// Outlet port of a component by component name.
    pub fn port(&self, component: &str) -> Option<&PortSnapshot> {
        self.ports.get(&Self::port_id(component))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(p: f64) -> PortSnapshot {
        PortSnapshot {
            component: "nozzle".to_string(),
            kind: "nozzle",
            mdot_kg_s: 0.5,
            p_pa: p,
            t_k: 600.0,
            quality: 1.0,
            derived: BTreeMap::from([("thrust_N".to_string(), 650.0)]),
        }
    }

    #[test]
    fn ports_are_keyed_by_outlet_id() {
        let snap = StateSnapshot {
            index: 3,
            time_s: 0.3,
            thrust_n: 650.0,
            ports: BTreeMap::from([(StateSnapshot::port_id("nozzle"), port(8e4))]),
        };
        assert_eq!(snap.port("nozzle").map(|p| p.p_pa), Some(8e4));
        assert!(snap.port("main_chamber").is_none());
    }

    #[test]
    fn json_uses_unit_suffixes() {
        let snap = StateSnapshot {
            index: 1,
            time_s: 0.1,
            thrust_n: 650.0,
            ports: BTreeMap::from([(StateSnapshot::port_id("nozzle"), port(8e4))]),
        };
        let v: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
        assert_eq!(v["thrust_N"], 650.0);
        assert_eq!(v["ports"]["nozzle.out"]["p_Pa"], 8e4);
        assert_eq!(v["ports"]["nozzle.out"]["derived"]["thrust_N"], 650.0);
    }
}
