use crate::core::forcefield::registry::ForcefieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No molecule has been set")]
    NoMolecule,

    #[error("Molecule contains no atoms")]
    EmptyMolecule,

    #[error("Force field error: {source}")]
    Forcefield {
        #[from]
        source: ForcefieldError,
    },

    #[error("Optimizer is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("Minimizer setup failed: {0}")]
    Setup(String),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
