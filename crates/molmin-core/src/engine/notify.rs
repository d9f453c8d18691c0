use super::state::MinimizerState;

pub type StateCallback = Box<dyn Fn(MinimizerState) + Send + Sync + 'static>;

/// Fan-out of state transitions to any number of observers.
///
/// Observers run synchronously, in subscription order, on the thread that
/// performed the transition.
#[derive(Default)]
pub struct StateNotifier {
    callbacks: Vec<StateCallback>,
}

impl StateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: StateCallback) {
        self.callbacks.push(callback);
    }

    pub fn notify(&self, state: MinimizerState) {
        for callback in &self.callbacks {
            callback(state);
        }
    }
}
