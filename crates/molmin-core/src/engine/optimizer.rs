use super::config::OptimizerConfig;
use super::error::EngineError;
use crate::core::forcefield::energy::EnergyModel;
use crate::core::forcefield::params::ForcefieldParams;
use crate::core::forcefield::registry::ForcefieldRegistry;
use crate::core::models::system::SharedSystem;
use nalgebra::{Point3, Vector3};
use std::sync::{Arc, PoisonError};
use tracing::{debug, info, trace, warn};

/// The contract between an [`EnergyMinimizer`](super::minimizer::EnergyMinimizer)
/// and the numerical engine it drives.
///
/// The minimizer moves the optimizer onto a worker for each [`step`](Self::step)
/// and takes it back when the step finishes, so an optimizer is never used from
/// two threads at once.
pub trait GeometryOptimizer: Send + 'static {
    /// Selects the force field by name. Fails if the name is not recognised.
    fn set_forcefield(&mut self, name: &str) -> Result<(), EngineError>;

    /// The currently selected force field, if any.
    fn forcefield_name(&self) -> Option<&str>;

    fn set_molecule(&mut self, molecule: SharedSystem);

    /// Prepares internal state for stepping with the current molecule and force field.
    fn setup(&mut self) -> Result<(), EngineError>;

    /// Advances the geometry by one iteration, writing new coordinates into the molecule.
    fn step(&mut self);

    /// Energy at the current geometry, in kcal/mol.
    fn energy(&self) -> f64;

    fn converged(&self) -> bool;
}

fn rms(gradient: &[Vector3<f64>]) -> f64 {
    if gradient.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = gradient.iter().map(|g| g.norm_squared()).sum();
    (sum_sq / (3 * gradient.len()) as f64).sqrt()
}

/// Steepest descent with an adaptive, backtracking step size.
///
/// Every step moves atoms against the gradient, scaled so that the atom with
/// the largest gradient is displaced by the current step size. Accepted steps
/// grow the step size; rejected trials halve it.
pub struct SteepestDescentOptimizer {
    config: OptimizerConfig,
    registry: Arc<ForcefieldRegistry>,
    forcefield: Option<Arc<ForcefieldParams>>,
    molecule: Option<SharedSystem>,
    model: Option<EnergyModel>,
    step_size: f64,
    energy: f64,
    rms_gradient: f64,
    last_energy_change: Option<f64>,
    stalled: bool,
    topology_stale: bool,
    steps_taken: usize,
}

impl SteepestDescentOptimizer {
    const STEP_GROWTH: f64 = 1.2;
    const STEP_SHRINK: f64 = 0.5;

    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_registry(config, Arc::new(ForcefieldRegistry::new()))
    }

    /// Creates an optimizer that resolves force-field names through `registry`.
    pub fn with_registry(config: OptimizerConfig, registry: Arc<ForcefieldRegistry>) -> Self {
        let step_size = config.initial_step_size;
        Self {
            config,
            registry,
            forcefield: None,
            molecule: None,
            model: None,
            step_size,
            energy: 0.0,
            rms_gradient: f64::INFINITY,
            last_energy_change: None,
            stalled: false,
            topology_stale: false,
            steps_taken: 0,
        }
    }

    /// RMS of the gradient components at the current geometry, kcal/(mol·Å).
    pub fn rms_gradient(&self) -> f64 {
        self.rms_gradient
    }

    /// Steps taken since the last [`setup`](GeometryOptimizer::setup).
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Returns `true` when atoms were removed after setup and the optimizer
    /// refuses to step until it is set up again.
    pub fn topology_stale(&self) -> bool {
        self.topology_stale
    }
}

impl Default for SteepestDescentOptimizer {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl GeometryOptimizer for SteepestDescentOptimizer {
    fn set_forcefield(&mut self, name: &str) -> Result<(), EngineError> {
        let params = self.registry.get(name)?;
        debug!(forcefield = %params.name, "Force field selected.");
        self.forcefield = Some(params);
        self.model = None;
        Ok(())
    }

    fn forcefield_name(&self) -> Option<&str> {
        self.forcefield.as_deref().map(|ff| ff.name.as_str())
    }

    fn set_molecule(&mut self, molecule: SharedSystem) {
        self.molecule = Some(molecule);
        self.model = None;
    }

    fn setup(&mut self) -> Result<(), EngineError> {
        let molecule = self.molecule.as_ref().ok_or(EngineError::NoMolecule)?;
        let params = self
            .forcefield
            .as_ref()
            .ok_or(EngineError::NotConfigured("force field"))?;

        let system = molecule.read().unwrap_or_else(PoisonError::into_inner);
        if system.is_empty() {
            return Err(EngineError::EmptyMolecule);
        }
        let model = EnergyModel::build(&system, params)?;
        let positions = model.gather_positions(&system).ok_or_else(|| {
            EngineError::Internal("atom vanished while building the energy model".to_string())
        })?;
        drop(system);

        let (energy, gradient) = model.energy_and_gradient(&positions);
        info!(
            forcefield = %params.name,
            atoms = model.atom_count(),
            bonds = model.bond_count(),
            pairs = model.pair_count(),
            energy,
            "Optimizer set up."
        );

        self.model = Some(model);
        self.energy = energy;
        self.rms_gradient = rms(&gradient);
        self.step_size = self.config.initial_step_size;
        self.last_energy_change = None;
        self.stalled = false;
        self.topology_stale = false;
        self.steps_taken = 0;
        Ok(())
    }

    fn step(&mut self) {
        let (Some(model), Some(molecule)) = (self.model.as_ref(), self.molecule.as_ref()) else {
            warn!("Step requested before a successful setup; ignoring.");
            return;
        };

        let positions = {
            let system = molecule.read().unwrap_or_else(PoisonError::into_inner);
            model.gather_positions(&system)
        };
        let Some(positions) = positions else {
            warn!("Molecule topology changed since setup; halting until the next setup.");
            self.topology_stale = true;
            return;
        };

        self.steps_taken += 1;
        let (energy, gradient) = model.energy_and_gradient(&positions);
        let max_norm = gradient.iter().map(|g| g.norm()).fold(0.0, f64::max);
        if max_norm <= f64::EPSILON {
            self.energy = energy;
            self.rms_gradient = 0.0;
            self.last_energy_change = Some(0.0);
            return;
        }

        let mut accepted: Option<(Vec<Point3<f64>>, f64)> = None;
        for _ in 0..self.config.line_search_attempts {
            let scale = self.step_size / max_norm;
            let trial: Vec<Point3<f64>> = positions
                .iter()
                .zip(&gradient)
                .map(|(p, g)| p - g * scale)
                .collect();
            let trial_energy = model.energy(&trial);
            trace!(step_size = self.step_size, trial_energy, "Line search trial.");

            if trial_energy < energy {
                self.step_size = (self.step_size * Self::STEP_GROWTH).min(self.config.max_step_size);
                accepted = Some((trial, trial_energy));
                break;
            }
            self.step_size *= Self::STEP_SHRINK;
            if self.step_size < self.config.min_step_size {
                break;
            }
        }

        match accepted {
            Some((trial, new_energy)) => {
                let (_, new_gradient) = model.energy_and_gradient(&trial);
                {
                    let mut system = molecule.write().unwrap_or_else(PoisonError::into_inner);
                    model.scatter_positions(&mut system, &trial);
                }
                self.rms_gradient = rms(&new_gradient);
                self.last_energy_change = Some(new_energy - energy);
                self.energy = new_energy;
            }
            None => {
                debug!(energy, "No downhill step found; treating geometry as converged.");
                self.stalled = true;
                self.energy = energy;
                self.rms_gradient = rms(&gradient);
                self.last_energy_change = Some(0.0);
            }
        }
    }

    fn energy(&self) -> f64 {
        self.energy
    }

    fn converged(&self) -> bool {
        if self.model.is_none() || self.topology_stale {
            return false;
        }
        self.stalled
            || self.rms_gradient < self.config.gradient_tolerance
            || self
                .last_energy_change
                .is_some_and(|delta| delta.abs() < self.config.energy_tolerance)
    }
}
