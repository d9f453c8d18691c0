use crate::core::models::atom::Element;
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_BOND_FORCE_CONSTANT: f64 = 700.0; // kcal/(mol·Å²)
pub const DEFAULT_NONBONDED_CUTOFF: f64 = 8.0; // Å
pub const DEFAULT_EXP6_SCALE: f64 = 12.0;

/// UFF non-bonded distance `x_i` (Å) and well depth `D_i` (kcal/mol) per element.
#[rustfmt::skip]
static UFF_VDW_PARAMS: Map<&'static str, (f64, f64)> = phf_map! {
    "H"  => (2.886, 0.044),
    "C"  => (3.851, 0.105),
    "N"  => (3.660, 0.069),
    "O"  => (3.500, 0.060),
    "F"  => (3.364, 0.050),
    "P"  => (4.147, 0.305),
    "S"  => (4.035, 0.274),
    "Cl" => (3.947, 0.227),
    "Br" => (4.189, 0.251),
    "I"  => (4.500, 0.339),
};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PotentialFunction {
    #[serde(rename = "lj-12-6")]
    LennardJones,
    #[serde(rename = "exp-6")]
    Buckingham,
}

impl fmt::Display for PotentialFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::LennardJones => "lj-12-6",
            Self::Buckingham => "exp-6",
        })
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum VdwParam {
    Buckingham {
        radius: f64,
        well_depth: f64,
        scale: f64,
    },
    LennardJones {
        radius: f64,
        well_depth: f64,
    },
}

impl VdwParam {
    pub fn radius(&self) -> f64 {
        match self {
            Self::Buckingham { radius, .. } | Self::LennardJones { radius, .. } => *radius,
        }
    }

    pub fn well_depth(&self) -> f64 {
        match self {
            Self::Buckingham { well_depth, .. } | Self::LennardJones { well_depth, .. } => {
                *well_depth
            }
        }
    }

    /// The exp-6 steepness parameter; LJ-style entries fall back to the default.
    pub fn scale(&self) -> f64 {
        match self {
            Self::Buckingham { scale, .. } => *scale,
            Self::LennardJones { .. } => DEFAULT_EXP6_SCALE,
        }
    }
}

fn default_bond_force_constant() -> f64 {
    DEFAULT_BOND_FORCE_CONSTANT
}

fn default_nonbonded_cutoff() -> f64 {
    DEFAULT_NONBONDED_CUTOFF
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalParams {
    pub potential_function: PotentialFunction,
    #[serde(default = "default_bond_force_constant")]
    pub bond_force_constant: f64,
    #[serde(default = "default_nonbonded_cutoff")]
    pub nonbonded_cutoff: f64,
}

/// A complete, named force-field parameter set.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ForcefieldParams {
    pub name: String,
    pub globals: GlobalParams,
    /// Van der Waals parameters keyed by element symbol.
    pub vdw: HashMap<String, VdwParam>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl ForcefieldParams {
    /// Builds a parameter set from the UFF element table.
    pub fn from_uff_table(name: &str, potential_function: PotentialFunction) -> Self {
        let vdw = UFF_VDW_PARAMS
            .entries()
            .map(|(&symbol, &(radius, well_depth))| {
                let param = match potential_function {
                    PotentialFunction::LennardJones => VdwParam::LennardJones { radius, well_depth },
                    PotentialFunction::Buckingham => VdwParam::Buckingham {
                        radius,
                        well_depth,
                        scale: DEFAULT_EXP6_SCALE,
                    },
                };
                (symbol.to_string(), param)
            })
            .collect();

        Self {
            name: name.to_string(),
            globals: GlobalParams {
                potential_function,
                bond_force_constant: DEFAULT_BOND_FORCE_CONSTANT,
                nonbonded_cutoff: DEFAULT_NONBONDED_CUTOFF,
            },
            vdw,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn vdw_for(&self, element: Element) -> Option<&VdwParam> {
        self.vdw.get(element.symbol())
    }
}
