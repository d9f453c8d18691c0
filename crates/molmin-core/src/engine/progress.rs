use super::state::MinimizerState;

/// Events emitted by [`workflows::minimize`](crate::workflows::minimize) while it drives a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    RunStart { forcefield: String, max_steps: usize },
    StepFinished { step: usize, energy: f64 },
    RunFinish { state: MinimizerState, steps: usize },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
