//! # Force Field Module
//!
//! Classical molecular mechanics energy functions used by the built-in geometry
//! optimizer.
//!
//! ## Overview
//!
//! A force field here is a harmonic bond-stretch term plus a non-bonded van der
//! Waals term (Lennard-Jones 12-6 or Buckingham exp-6). Parameter sets are named
//! and resolved through a [`registry::ForcefieldRegistry`]; two are built in
//! (`lj-12-6` and `exp-6`, both derived from UFF element parameters) and more can
//! be loaded from TOML files.
//!
//! ## Key Components
//!
//! - [`params`] - Parameter structures and TOML loading
//! - [`registry`] - Name-based lookup of parameter sets
//! - [`energy`] - Energy and gradient evaluation bound to one molecular topology
//!
//! ## Usage
//!
//! ```ignore
//! use molmin::core::forcefield::{energy::EnergyModel, registry::ForcefieldRegistry};
//!
//! let params = ForcefieldRegistry::new().get("lj-12-6")?;
//! let model = EnergyModel::build(&system, &params)?;
//! let positions = model.gather_positions(&system).unwrap();
//! let (energy, gradient) = model.energy_and_gradient(&positions);
//! ```

pub mod energy;
pub mod params;
pub(crate) mod potentials;
pub mod registry;
