use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use molmin::engine::progress::{Progress, ProgressCallback};
use molmin::engine::state::MinimizerState;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::bar_style())
            .with_message("Initializing...");
        pb.set_draw_target(target);
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::RunStart {
                    forcefield,
                    max_steps,
                } => {
                    pb_guard.reset();
                    pb_guard.set_style(Self::bar_style());
                    pb_guard.set_length(max_steps as u64);
                    pb_guard.set_position(0);
                    pb_guard.set_message(format!("Minimizing ({})", forcefield));
                }
                Progress::StepFinished { step, energy } => {
                    pb_guard.set_position(step as u64);
                    pb_guard.set_message(format!("E = {:.4} kcal/mol", energy));
                }
                Progress::RunFinish { state, steps } => {
                    pb_guard.set_position(steps as u64);
                    match state {
                        MinimizerState::SetupFailed => {
                            pb_guard.abandon_with_message(format!("✗ {}", state));
                        }
                        _ => {
                            pb_guard.finish_with_message(format!("✓ {} after {} steps", state, steps));
                        }
                    }
                }
                Progress::Message(msg) => {
                    pb_guard.println(format!("  {}", msg));
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<28} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "elapsed",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.elapsed().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
