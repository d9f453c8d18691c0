//! # Workflows Module
//!
//! High-level entry points that run a complete minimization and collect its results.
//!
//! ## Overview
//!
//! The engine's [`EnergyMinimizer`](crate::engine::minimizer::EnergyMinimizer)
//! is step-driven: something has to keep calling `start` and draining
//! completions. Workflows are that something for batch use. They run the
//! step loop to convergence or a step limit, record an energy trace, and
//! report progress through a [`ProgressReporter`](crate::engine::progress::ProgressReporter).
//!
//! ## Architecture
//!
//! - **Minimization Workflow** ([`minimize`]) - Steps a minimizer until it
//!   converges, fails setup, or reaches the step limit.

pub mod minimize;
