//! # Core Models Module
//!
//! Data structures describing a molecule as the minimizer sees it: atoms with
//! elements and Cartesian coordinates, bonds with orders, and the system that
//! owns both.
//!
//! ## Key Components
//!
//! - [`atom`] - Atoms and the chemical elements supported by the built-in force fields
//! - [`topology`] - Bond connectivity and bond orders
//! - [`system`] - The molecular system and the [`system::SharedSystem`] handle
//! - [`ids`] - Stable identifiers for atoms
//!
//! ## Usage
//!
//! ```ignore
//! use molmin::core::models::{atom::{Atom, Element}, system::MolecularSystem};
//!
//! let mut system = MolecularSystem::new();
//! let c = system.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
//! let o = system.add_atom(Atom::new(Element::O, Point3::new(1.2, 0.0, 0.0)));
//! system.add_bond(c, o, BondOrder::Double);
//! let shared = system.into_shared();
//! ```

pub mod atom;
pub mod ids;
pub mod system;
pub mod topology;
