//! # Core Module
//!
//! The stateless foundation of the minimizer: molecular data structures, force
//! field definitions and file I/O.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds and the molecular system
//! - **Energy Calculations** ([`forcefield`]) - Potentials, parameter sets and energy models
//! - **File I/O** ([`io`]) - XYZ structure files and CSV energy traces
//!
//! Nothing in this module spawns work or holds run state; that lives in
//! [`crate::engine`].

pub mod forcefield;
pub mod io;
pub mod models;
