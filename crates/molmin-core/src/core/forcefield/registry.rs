use super::params::{ForcefieldParams, ParamLoadError, PotentialFunction};
use crate::core::models::atom::Element;
use phf::{Map, phf_map};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Force fields that are always available, built from the UFF element table.
static BUILTIN_FORCEFIELDS: Map<&'static str, PotentialFunction> = phf_map! {
    "lj-12-6" => PotentialFunction::LennardJones,
    "exp-6" => PotentialFunction::Buckingham,
};

#[derive(Debug, Error)]
pub enum ForcefieldError {
    #[error("Unknown force field: '{0}'")]
    UnknownForcefield(String),

    #[error("Force field '{forcefield}' has no van der Waals parameters for element {element}")]
    MissingVdwParam {
        forcefield: String,
        element: Element,
    },

    #[error("Failed to load force field parameters: {source}")]
    ParamLoad {
        #[from]
        source: ParamLoadError,
    },
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Resolves force-field names to parameter sets.
///
/// Built-in force fields are materialized on lookup; registered parameter sets
/// take precedence over a built-in of the same name.
#[derive(Debug, Clone, Default)]
pub struct ForcefieldRegistry {
    custom: HashMap<String, Arc<ForcefieldParams>>,
}

impl ForcefieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a force field by name, ignoring case and surrounding whitespace.
    pub fn get(&self, name: &str) -> Result<Arc<ForcefieldParams>, ForcefieldError> {
        let key = normalize(name);
        if let Some(params) = self.custom.get(&key) {
            return Ok(Arc::clone(params));
        }
        BUILTIN_FORCEFIELDS
            .get(key.as_str())
            .map(|&potential| Arc::new(ForcefieldParams::from_uff_table(&key, potential)))
            .ok_or(ForcefieldError::UnknownForcefield(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = normalize(name);
        self.custom.contains_key(&key) || BUILTIN_FORCEFIELDS.contains_key(key.as_str())
    }

    /// Registers a parameter set under its own name.
    ///
    /// # Return
    ///
    /// The previously registered parameter set with the same name, if any.
    pub fn register(&mut self, params: ForcefieldParams) -> Option<Arc<ForcefieldParams>> {
        let key = normalize(&params.name);
        debug!(forcefield = %key, "Registering force field.");
        self.custom.insert(key, Arc::new(params))
    }

    /// Loads a TOML parameter file and registers it.
    ///
    /// # Return
    ///
    /// The normalized name the parameter set was registered under.
    pub fn load_and_register(&mut self, path: &Path) -> Result<String, ForcefieldError> {
        let params = ForcefieldParams::load(path)?;
        let key = normalize(&params.name);
        self.register(params);
        Ok(key)
    }

    /// All resolvable force-field names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_FORCEFIELDS
            .keys()
            .map(|name| name.to_string())
            .chain(self.custom.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
