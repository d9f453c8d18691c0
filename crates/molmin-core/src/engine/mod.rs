//! # Engine Module
//!
//! The stateful layer of molmin: it drives a geometry optimizer step by step
//! in the background while the caller stays responsive.
//!
//! ## Overview
//!
//! [`minimizer::EnergyMinimizer`] is the controller. It owns the molecule
//! selection and the force-field choice, and it tracks whether setup is needed.
//! It hands one optimizer step at a time to a [`executor::StepExecutor`] and
//! publishes every state transition to its subscribers. The numerical work sits
//! behind the [`optimizer::GeometryOptimizer`] trait, and
//! [`optimizer::SteepestDescentOptimizer`] is the built-in implementation.
//!
//! ## Architecture
//!
//! - **Controller** ([`minimizer`]) - Lifecycle, setup gating, stale-result handling
//! - **Optimizer Contract** ([`optimizer`]) - The trait plus steepest descent
//! - **Executors** ([`executor`]) - Rayon, OS-thread and inline step runners
//! - **State** ([`state`], [`notify`]) - Lifecycle states and their observers
//! - **Configuration** ([`config`]) - Optimizer and run parameters with builders
//! - **Progress Monitoring** ([`progress`]) - Events for run-level reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! ## Usage
//!
//! ```ignore
//! use molmin::engine::minimizer::EnergyMinimizer;
//! use molmin::engine::state::MinimizerState;
//!
//! let mut minimizer = EnergyMinimizer::with_defaults(Some(molecule));
//! minimizer.subscribe(|state| println!("{}", state));
//! minimizer.start();
//! while minimizer.wait_for_step() && minimizer.state() == MinimizerState::UpdateReady {
//!     minimizer.start();
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod minimizer;
pub mod notify;
pub mod optimizer;
pub mod progress;
pub mod state;
