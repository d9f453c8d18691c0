//! # molmin
//!
//! Asynchronous molecular energy minimization: a step-driven controller that
//! runs a geometry optimizer in the background and reports its progress as a
//! small set of observable states.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so each layer can be tested
//! on its own.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`),
//!   force-field parameters and energy evaluation, and file I/O (XYZ
//!   coordinates, CSV energy traces).
//!
//! - **[`engine`]: The Logic Core.** The `EnergyMinimizer` controller, the
//!   `GeometryOptimizer` contract with its steepest-descent implementation,
//!   and the executors that run steps off the caller's thread.
//!
//! - **[`workflows`]: The Public API.** Batch entry points that drive a
//!   minimizer to convergence and collect the result.

pub mod core;
pub mod engine;
pub mod workflows;
