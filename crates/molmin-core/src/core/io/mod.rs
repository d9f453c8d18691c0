//! Provides input/output functionality for molecular structures and minimization output.
//!
//! Structures are exchanged as XYZ files through the [`traits::MolecularFile`]
//! interface; per-step energies can be written as CSV traces.

pub mod trace;
pub mod traits;
pub mod xyz;
