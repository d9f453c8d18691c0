use crate::core::forcefield::registry::ForcefieldRegistry;
use crate::core::io::trace::TraceRecord;
use crate::core::models::system::SharedSystem;
use crate::engine::config::MinimizationConfig;
use crate::engine::error::EngineError;
use crate::engine::executor::StepExecutor;
use crate::engine::minimizer::EnergyMinimizer;
use crate::engine::optimizer::{GeometryOptimizer, SteepestDescentOptimizer};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::MinimizerState;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationResult {
    /// `Converged`, or `UpdateReady` when the step limit was reached first.
    pub final_state: MinimizerState,
    pub steps: usize,
    pub initial_energy: f64,
    pub energy: f64,
    pub trace: Vec<TraceRecord>,
}

impl MinimizationResult {
    pub fn converged(&self) -> bool {
        self.final_state == MinimizerState::Converged
    }
}

/// Steps `minimizer` until it converges or `max_steps` steps have completed.
///
/// # Errors
///
/// Returns [`EngineError::Setup`] if the minimizer cannot be set up, and
/// [`EngineError::Internal`] if the minimizer is stopped from elsewhere.
#[instrument(skip_all, name = "minimize_workflow", fields(max_steps = max_steps))]
pub fn run<O: GeometryOptimizer>(
    minimizer: &mut EnergyMinimizer<O>,
    max_steps: usize,
    reporter: &ProgressReporter,
) -> Result<MinimizationResult, EngineError> {
    reporter.report(Progress::RunStart {
        forcefield: minimizer.requested_forcefield().to_string(),
        max_steps,
    });
    info!(
        forcefield = minimizer.requested_forcefield(),
        "Starting minimization."
    );

    let mut trace = Vec::new();
    let mut steps = 0;

    minimizer.start();
    let initial_energy = minimizer.energy();

    loop {
        match minimizer.state() {
            MinimizerState::SetupFailed => {
                let reason = minimizer
                    .last_setup_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown reason".to_string());
                reporter.report(Progress::RunFinish {
                    state: MinimizerState::SetupFailed,
                    steps,
                });
                return Err(EngineError::Setup(reason));
            }
            MinimizerState::Running | MinimizerState::SettingUp => {
                if !minimizer.wait_for_step() {
                    return Err(EngineError::Internal(
                        "minimizer reported Running with no step in flight".to_string(),
                    ));
                }
            }
            state @ (MinimizerState::UpdateReady | MinimizerState::Converged) => {
                steps += 1;
                let energy = minimizer.energy();
                trace.push(TraceRecord {
                    step: steps,
                    energy,
                    state: state.label().to_string(),
                });
                reporter.report(Progress::StepFinished {
                    step: steps,
                    energy,
                });

                if state == MinimizerState::Converged || steps >= max_steps {
                    break;
                }
                minimizer.start();
            }
            MinimizerState::Stopped => {
                return Err(EngineError::Internal(
                    "minimizer was stopped during the run".to_string(),
                ));
            }
        }
    }

    let final_state = minimizer.state();
    let energy = minimizer.energy();
    if final_state == MinimizerState::Converged {
        info!(steps, energy, "Minimization converged.");
    } else {
        warn!(steps, energy, "Step limit reached before convergence.");
        reporter.report(Progress::Message(format!(
            "Step limit of {} reached before convergence.",
            max_steps
        )));
    }
    reporter.report(Progress::RunFinish {
        state: final_state,
        steps,
    });

    Ok(MinimizationResult {
        final_state,
        steps,
        initial_energy,
        energy,
        trace,
    })
}

/// Minimizes `molecule` with the steepest-descent optimizer described by `config`.
///
/// Coordinates are updated in place; the shared handle reflects the final
/// geometry when this returns.
pub fn minimize_system(
    molecule: SharedSystem,
    config: &MinimizationConfig,
    registry: Arc<ForcefieldRegistry>,
    executor: Arc<dyn StepExecutor>,
    reporter: &ProgressReporter,
) -> Result<MinimizationResult, EngineError> {
    let optimizer = SteepestDescentOptimizer::with_registry(config.optimizer.clone(), registry);
    let mut minimizer = EnergyMinimizer::new(Some(molecule), optimizer, executor);
    minimizer.set_forcefield(config.forcefield.clone());
    let result = run(&mut minimizer, config.max_steps, reporter)?;
    if let Some(optimizer) = minimizer.optimizer() {
        debug!(
            rms_gradient = optimizer.rms_gradient(),
            steps_taken = optimizer.steps_taken(),
            "Final optimizer status."
        );
    }
    Ok(result)
}
