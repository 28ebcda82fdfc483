//! Devicetree node model and match table.
//!
//! [`ThsNode`] mirrors the properties of an `allwinner,sun50i-h6-ths`
//! node (see `bindings/allwinner,sun50i-h6-ths.yaml`) and deserialises from
//! a JSON rendering of it. [`ThsNode::validate`] checks the properties
//! probe relies on and resolves the sensor family.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::{SUN50I_H6, SensorFamily};
use crate::error::ResourceError;

/// `compatible` → family.
pub const MATCH_TABLE: &[(&str, &SensorFamily)] = &[("allwinner,sun50i-h6-ths", &SUN50I_H6)];

/// Family of the first `compatible` entry found in [`MATCH_TABLE`].
pub fn match_compatible<S: AsRef<str>>(compatible: &[S]) -> Option<&'static SensorFamily> {
    compatible.iter().find_map(|c| {
        MATCH_TABLE
            .iter()
            .find(|(name, _)| *name == c.as_ref())
            .map(|(_, family)| *family)
    })
}

/// One `reg` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegWindow {
    pub base: u64,
    pub size: u64,
}

/// Phandle plus specifier cells.
pub type Specifier = Vec<u32, 4>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThsNode {
    pub compatible: Vec<String<40>, 4>,
    pub reg: Option<RegWindow>,
    pub interrupts: Vec<u32, 4>,
    #[serde(default)]
    pub clocks: Vec<Specifier, 4>,
    pub clock_names: Vec<String<16>, 4>,
    pub resets: Vec<Specifier, 4>,
    #[serde(default)]
    pub nvmem_cells: Vec<u32, 4>,
    #[serde(default)]
    pub nvmem_cell_names: Vec<String<16>, 4>,
    #[serde(rename = "#thermal-sensor-cells", default = "default_sensor_cells")]
    pub thermal_sensor_cells: u32,
}

fn default_sensor_cells() -> u32 {
    1
}

/// The H6 `ths` node from the reference board devicetree.
pub const H6_REFERENCE_NODE: &str = r##"{
    "compatible": ["allwinner,sun50i-h6-ths"],
    "reg": { "base": 84345856, "size": 256 },
    "interrupts": [15],
    "clocks": [[1, 89]],
    "clock-names": ["bus"],
    "resets": [[1, 47]],
    "nvmem-cells": [3],
    "nvmem-cell-names": ["calibration"],
    "#thermal-sensor-cells": 1
}"##;

impl ThsNode {
    pub fn from_json(json: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(json).map_err(|_| ResourceError::InvalidBinding("malformed node"))
    }

    /// The reference H6 node.
    pub fn h6_reference() -> Result<Self, ResourceError> {
        Self::from_json(H6_REFERENCE_NODE)
    }

    pub fn family(&self) -> Option<&'static SensorFamily> {
        match_compatible(&self.compatible)
    }

    /// Check the properties probe needs and return the matched family.
    pub fn validate(&self) -> Result<&'static SensorFamily, ResourceError> {
        let family = self.family().ok_or(ResourceError::NoMatchData)?;
        match self.reg {
            None => return Err(ResourceError::NoMemResource),
            Some(w) if w.size == 0 => {
                return Err(ResourceError::InvalidBinding("reg has zero length"));
            }
            Some(_) => {}
        }
        if self.interrupts.is_empty() {
            return Err(ResourceError::InvalidBinding("interrupts is empty"));
        }
        if self.clocks.is_empty() {
            return Err(ResourceError::InvalidBinding("clocks is empty"));
        }
        if !self.clock_names.iter().any(|n| n.as_str() == "bus") {
            return Err(ResourceError::InvalidBinding("clock-names lacks \"bus\""));
        }
        if self.resets.is_empty() {
            return Err(ResourceError::InvalidBinding("resets is empty"));
        }
        if !self.nvmem_cells.is_empty()
            && !self
                .nvmem_cell_names
                .iter()
                .any(|n| n.as_str() == "calibration")
        {
            return Err(ResourceError::InvalidBinding(
                "nvmem-cell-names lacks \"calibration\"",
            ));
        }
        if self.thermal_sensor_cells != 1 {
            return Err(ResourceError::InvalidBinding("#thermal-sensor-cells must be 1"));
        }
        Ok(family)
    }
}
