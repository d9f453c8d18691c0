use super::config::DEFAULT_FORCEFIELD;
use super::error::EngineError;
use super::executor::{RayonExecutor, StepExecutor};
use super::notify::StateNotifier;
use super::optimizer::{GeometryOptimizer, SteepestDescentOptimizer};
use super::state::MinimizerState;
use crate::core::models::system::SharedSystem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a worker hands back after running one step.
struct StepCompletion<O> {
    run: u64,
    optimizer: O,
}

/// Drives a [`GeometryOptimizer`] one step at a time without blocking the caller.
///
/// Each call to [`start`](Self::start) moves the optimizer onto the configured
/// [`StepExecutor`] to run a single step. The optimizer comes back through an
/// internal channel and the owner observes the result by draining completions
/// ([`process_completions`](Self::process_completions) or one of the `wait_*`
/// methods). The state then becomes [`MinimizerState::UpdateReady`] or
/// [`MinimizerState::Converged`], and the owner calls `start` again to continue.
///
/// A step that is in flight when [`stop`](Self::stop) is called still runs to
/// completion, but its result is discarded.
///
/// If a step panics on the worker the optimizer is lost and
/// [`wait_for_step`](Self::wait_for_step) never returns; prefer
/// [`wait_for_step_timeout`](Self::wait_for_step_timeout) where that matters.
pub struct EnergyMinimizer<O: GeometryOptimizer> {
    molecule: Option<SharedSystem>,
    forcefield: String,
    molecule_changed: bool,
    optimizer: Option<O>,
    configured_forcefield: Option<String>,
    energy_at_dispatch: f64,
    state: MinimizerState,
    notifier: StateNotifier,
    executor: Arc<dyn StepExecutor>,
    completion_tx: Sender<StepCompletion<O>>,
    completion_rx: Receiver<StepCompletion<O>>,
    run: u64,
    restart_pending: bool,
    last_setup_error: Option<EngineError>,
}

impl EnergyMinimizer<SteepestDescentOptimizer> {
    /// A minimizer with the default steepest-descent optimizer on rayon's global pool.
    pub fn with_defaults(molecule: Option<SharedSystem>) -> Self {
        Self::new(
            molecule,
            SteepestDescentOptimizer::default(),
            Arc::new(RayonExecutor::global()),
        )
    }
}

impl<O: GeometryOptimizer> EnergyMinimizer<O> {
    pub fn new(molecule: Option<SharedSystem>, optimizer: O, executor: Arc<dyn StepExecutor>) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        let energy_at_dispatch = optimizer.energy();
        Self {
            molecule,
            forcefield: DEFAULT_FORCEFIELD.to_string(),
            molecule_changed: true,
            optimizer: Some(optimizer),
            configured_forcefield: None,
            energy_at_dispatch,
            state: MinimizerState::Stopped,
            notifier: StateNotifier::new(),
            executor,
            completion_tx,
            completion_rx,
            run: 0,
            restart_pending: false,
            last_setup_error: None,
        }
    }

    /// Replaces the molecule being minimized.
    ///
    /// Passing the molecule that is already set (the same shared handle) does
    /// nothing. Any other change marks the minimizer for setup on the next
    /// [`start`](Self::start).
    pub fn set_molecule(&mut self, molecule: Option<SharedSystem>) {
        let unchanged = match (&self.molecule, &molecule) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        debug!("Molecule replaced; setup required before the next step.");
        self.molecule = molecule;
        self.molecule_changed = true;
    }

    pub fn molecule(&self) -> Option<&SharedSystem> {
        self.molecule.as_ref()
    }

    /// Forces (or cancels) setup on the next [`start`](Self::start), e.g. after
    /// the owner edits the molecule's atoms or bonds in place.
    pub fn set_molecule_changed(&mut self, changed: bool) {
        self.molecule_changed = changed;
    }

    pub fn molecule_changed(&self) -> bool {
        self.molecule_changed
    }

    /// Selects the force field used at the next setup.
    ///
    /// Always marks the minimizer for setup, even if the name is unchanged.
    pub fn set_forcefield(&mut self, name: impl Into<String>) {
        self.forcefield = name.into();
        self.molecule_changed = true;
    }

    /// The force field that will be requested at the next setup.
    pub fn requested_forcefield(&self) -> &str {
        &self.forcefield
    }

    /// The force field the optimizer last accepted, or `None` before any setup.
    pub fn forcefield(&self) -> Option<&str> {
        self.configured_forcefield.as_deref()
    }

    /// Energy of the most recently observed geometry, in kcal/mol.
    ///
    /// While a step is in flight this is the energy from before that step.
    pub fn energy(&self) -> f64 {
        self.optimizer
            .as_ref()
            .map_or(self.energy_at_dispatch, |optimizer| optimizer.energy())
    }

    pub fn state(&self) -> MinimizerState {
        self.state
    }

    pub fn state_label(&self) -> &'static str {
        self.state.label()
    }

    /// The optimizer, unless it is currently out on a worker.
    pub fn optimizer(&self) -> Option<&O> {
        self.optimizer.as_ref()
    }

    pub fn is_step_in_flight(&self) -> bool {
        self.optimizer.is_none()
    }

    /// The error from the most recent failed setup, cleared when a step is dispatched.
    pub fn last_setup_error(&self) -> Option<&EngineError> {
        self.last_setup_error.as_ref()
    }

    /// Registers an observer that is called once per state transition.
    pub fn subscribe(&mut self, callback: impl Fn(MinimizerState) + Send + Sync + 'static) {
        self.notifier.subscribe(Box::new(callback));
    }

    /// Begins (or continues) minimization by dispatching one step.
    ///
    /// Performs setup first when the molecule or force field changed. Setup
    /// failures leave the minimizer in [`MinimizerState::SetupFailed`] and keep
    /// the change flag set, so the next call retries setup.
    ///
    /// While a step is in flight, a call in the `Running` state is ignored. A
    /// call after [`stop`](Self::stop) queues a restart that runs as soon as the
    /// stale step comes back; the state stays as it is until then.
    pub fn start(&mut self) {
        let molecule = match self.checked_molecule() {
            Ok(molecule) => molecule,
            Err(e) => {
                if self.optimizer.is_none() {
                    // The in-flight step no longer belongs to a live run.
                    self.restart_pending = false;
                    self.run = self.run.wrapping_add(1);
                }
                self.fail_setup(e);
                return;
            }
        };

        if self.optimizer.is_none() {
            if self.state == MinimizerState::Running {
                warn!("A minimization step is already in flight; ignoring start request.");
                return;
            }
            debug!("Stale step still in flight; queueing restart.");
            self.restart_pending = true;
            return;
        }

        if self.molecule_changed {
            self.set_state(MinimizerState::SettingUp);
            if let Err(e) = self.configure(molecule) {
                self.fail_setup(e);
                return;
            }
            self.molecule_changed = false;
        }

        self.dispatch();
    }

    /// Stops minimization. Results of a step that is still in flight are discarded.
    pub fn stop(&mut self) {
        self.restart_pending = false;
        self.run = self.run.wrapping_add(1);
        self.set_state(MinimizerState::Stopped);
    }

    /// Handles every step that has finished, without blocking.
    ///
    /// # Return
    ///
    /// The number of completions handled, including discarded ones.
    pub fn process_completions(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Blocks until the in-flight step finishes and handles it.
    ///
    /// Returns `false` without blocking when no step is in flight and none is
    /// waiting to be handled.
    pub fn wait_for_step(&mut self) -> bool {
        if self.optimizer.is_some() {
            return self.process_completions() > 0;
        }
        match self.completion_rx.recv() {
            Ok(completion) => {
                self.handle_completion(completion);
                true
            }
            Err(_) => false,
        }
    }

    /// Like [`wait_for_step`](Self::wait_for_step), giving up after `timeout`.
    pub fn wait_for_step_timeout(&mut self, timeout: Duration) -> bool {
        if self.optimizer.is_some() {
            return self.process_completions() > 0;
        }
        match self.completion_rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.handle_completion(completion);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn checked_molecule(&self) -> Result<SharedSystem, EngineError> {
        let molecule = self.molecule.clone().ok_or(EngineError::NoMolecule)?;
        let is_empty = molecule
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty();
        if is_empty {
            return Err(EngineError::EmptyMolecule);
        }
        Ok(molecule)
    }

    fn configure(&mut self, molecule: SharedSystem) -> Result<(), EngineError> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| EngineError::Internal("optimizer unavailable during setup".to_string()))?;

        optimizer.set_forcefield(&self.forcefield)?;
        self.configured_forcefield = optimizer.forcefield_name().map(str::to_string);
        optimizer.set_molecule(molecule);
        optimizer.setup()?;

        info!(
            forcefield = self.configured_forcefield.as_deref().unwrap_or(&self.forcefield),
            energy = optimizer.energy(),
            "Minimizer set up."
        );
        Ok(())
    }

    fn dispatch(&mut self) {
        let Some(mut optimizer) = self.optimizer.take() else {
            return;
        };
        self.energy_at_dispatch = optimizer.energy();
        let run = self.run;
        let tx = self.completion_tx.clone();

        self.executor.execute(Box::new(move || {
            optimizer.step();
            if tx.send(StepCompletion { run, optimizer }).is_err() {
                debug!("Minimizer dropped before the step finished; discarding result.");
            }
        }));

        self.last_setup_error = None;
        self.set_state(MinimizerState::Running);
    }

    fn handle_completion(&mut self, completion: StepCompletion<O>) {
        let StepCompletion { run, optimizer } = completion;
        let converged = optimizer.converged();
        let energy = optimizer.energy();
        self.optimizer = Some(optimizer);

        if run != self.run || self.state == MinimizerState::Stopped {
            debug!(energy, "Discarding result of a stopped step.");
            if std::mem::take(&mut self.restart_pending) {
                self.start();
            }
            return;
        }

        if converged {
            info!(energy, "Minimization converged.");
            self.set_state(MinimizerState::Converged);
        } else {
            debug!(energy, "Step finished.");
            self.set_state(MinimizerState::UpdateReady);
        }
    }

    fn fail_setup(&mut self, error: EngineError) {
        warn!(error = %error, "Minimizer setup failed.");
        self.last_setup_error = Some(error);
        self.set_state(MinimizerState::SetupFailed);
    }

    fn set_state(&mut self, state: MinimizerState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "Minimizer state changed.");
        self.state = state;
        self.notifier.notify(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::registry::ForcefieldError;
    use crate::core::models::atom::{Atom, Element};
    use crate::core::models::system::MolecularSystem;
    use crate::engine::executor::{InlineExecutor, StepJob};
    use nalgebra::Point3;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Holds jobs until the test releases them.
    #[derive(Default)]
    struct QueuedExecutor {
        jobs: Mutex<Vec<StepJob>>,
    }

    impl QueuedExecutor {
        fn pending(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }

        fn run_all(&self) {
            let jobs: Vec<StepJob> = self.jobs.lock().unwrap().drain(..).collect();
            for job in jobs {
                job();
            }
        }
    }

    impl StepExecutor for QueuedExecutor {
        fn execute(&self, job: StepJob) {
            self.jobs.lock().unwrap().push(job);
        }
    }

    #[derive(Default)]
    struct Calls {
        set_forcefield: AtomicUsize,
        setup: AtomicUsize,
        step: AtomicUsize,
    }

    /// Scripted optimizer: energy drops by one per step and it converges after
    /// `converge_after` steps.
    struct FakeOptimizer {
        calls: Arc<Calls>,
        forcefield: Option<String>,
        energy: f64,
        steps: usize,
        converge_after: usize,
        fail_setup: bool,
    }

    impl FakeOptimizer {
        fn new(calls: Arc<Calls>, converge_after: usize) -> Self {
            Self {
                calls,
                forcefield: None,
                energy: 10.0,
                steps: 0,
                converge_after,
                fail_setup: false,
            }
        }
    }

    impl GeometryOptimizer for FakeOptimizer {
        fn set_forcefield(&mut self, name: &str) -> Result<(), EngineError> {
            self.calls.set_forcefield.fetch_add(1, Ordering::SeqCst);
            if name == "bogus" {
                return Err(ForcefieldError::UnknownForcefield(name.to_string()).into());
            }
            self.forcefield = Some(name.to_string());
            Ok(())
        }

        fn forcefield_name(&self) -> Option<&str> {
            self.forcefield.as_deref()
        }

        fn set_molecule(&mut self, _molecule: SharedSystem) {}

        fn setup(&mut self) -> Result<(), EngineError> {
            self.calls.setup.fetch_add(1, Ordering::SeqCst);
            if self.fail_setup {
                return Err(EngineError::Setup("scripted failure".to_string()));
            }
            self.steps = 0;
            Ok(())
        }

        fn step(&mut self) {
            self.calls.step.fetch_add(1, Ordering::SeqCst);
            self.steps += 1;
            self.energy -= 1.0;
        }

        fn energy(&self) -> f64 {
            self.energy
        }

        fn converged(&self) -> bool {
            self.steps >= self.converge_after
        }
    }

    fn molecule() -> SharedSystem {
        let mut system = MolecularSystem::new();
        system.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        system.add_atom(Atom::new(Element::C, Point3::new(1.6, 0.0, 0.0)));
        system.into_shared()
    }

    struct Harness {
        minimizer: EnergyMinimizer<FakeOptimizer>,
        calls: Arc<Calls>,
        states: Arc<Mutex<Vec<MinimizerState>>>,
    }

    fn harness_with(
        molecule: Option<SharedSystem>,
        converge_after: usize,
        executor: Arc<dyn StepExecutor>,
    ) -> Harness {
        let calls = Arc::new(Calls::default());
        let optimizer = FakeOptimizer::new(Arc::clone(&calls), converge_after);
        let mut minimizer = EnergyMinimizer::new(molecule, optimizer, executor);
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        minimizer.subscribe(move |state| sink.lock().unwrap().push(state));
        Harness {
            minimizer,
            calls,
            states,
        }
    }

    fn inline_harness(converge_after: usize) -> Harness {
        harness_with(Some(molecule()), converge_after, Arc::new(InlineExecutor::new()))
    }

    impl Harness {
        fn states(&self) -> Vec<MinimizerState> {
            self.states.lock().unwrap().clone()
        }

        fn clear_states(&self) {
            self.states.lock().unwrap().clear();
        }
    }

    #[test]
    fn new_minimizer_is_stopped_and_dirty() {
        let h = inline_harness(3);
        assert_eq!(h.minimizer.state(), MinimizerState::Stopped);
        assert_eq!(h.minimizer.state_label(), "Stopped");
        assert!(h.minimizer.molecule_changed());
        assert_eq!(h.minimizer.requested_forcefield(), DEFAULT_FORCEFIELD);
        assert_eq!(h.minimizer.forcefield(), None);
        assert!(!h.minimizer.is_step_in_flight());
    }

    #[test]
    fn start_without_molecule_fails_setup_and_dispatches_nothing() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(None, 3, executor.clone());

        h.minimizer.start();

        assert_eq!(h.minimizer.state(), MinimizerState::SetupFailed);
        assert_eq!(h.states(), vec![MinimizerState::SetupFailed]);
        assert!(matches!(
            h.minimizer.last_setup_error(),
            Some(EngineError::NoMolecule)
        ));
        assert_eq!(executor.pending(), 0);
        assert_eq!(h.calls.setup.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_with_empty_molecule_fails_setup() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(
            Some(MolecularSystem::new().into_shared()),
            3,
            executor.clone(),
        );

        h.minimizer.start();

        assert_eq!(h.minimizer.state(), MinimizerState::SetupFailed);
        assert!(matches!(
            h.minimizer.last_setup_error(),
            Some(EngineError::EmptyMolecule)
        ));
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn first_start_sets_up_then_dispatches_one_step() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 3, executor.clone());

        h.minimizer.start();

        assert_eq!(
            h.states(),
            vec![MinimizerState::SettingUp, MinimizerState::Running]
        );
        assert_eq!(executor.pending(), 1);
        assert!(h.minimizer.is_step_in_flight());
        assert!(!h.minimizer.molecule_changed());
        assert_eq!(h.minimizer.forcefield(), Some(DEFAULT_FORCEFIELD));
        assert_eq!(h.calls.setup.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finished_step_reports_update_ready() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 3, executor.clone());
        h.minimizer.start();
        assert_eq!(h.minimizer.energy(), 10.0);

        executor.run_all();
        assert_eq!(h.minimizer.state(), MinimizerState::Running);
        assert_eq!(h.minimizer.process_completions(), 1);

        assert_eq!(h.minimizer.state(), MinimizerState::UpdateReady);
        assert_eq!(h.minimizer.energy(), 9.0);
        assert!(!h.minimizer.is_step_in_flight());
    }

    #[test]
    fn continuation_does_not_repeat_setup() {
        let mut h = inline_harness(5);
        h.minimizer.start();
        h.minimizer.process_completions();
        h.clear_states();

        h.minimizer.start();

        assert_eq!(h.states(), vec![MinimizerState::Running]);
        assert_eq!(h.calls.setup.load(Ordering::SeqCst), 1);
        assert_eq!(h.calls.set_forcefield.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_stepping_until_converged() {
        let mut h = inline_harness(3);
        let mut steps = 0;
        h.minimizer.start();
        while h.minimizer.wait_for_step() {
            steps += 1;
            if h.minimizer.state() == MinimizerState::Converged {
                break;
            }
            h.minimizer.start();
        }

        assert_eq!(steps, 3);
        assert_eq!(h.minimizer.state(), MinimizerState::Converged);
        assert_eq!(h.minimizer.energy(), 7.0);
        assert_eq!(h.calls.step.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn start_while_running_is_ignored() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 3, executor.clone());
        h.minimizer.start();
        h.clear_states();

        h.minimizer.start();

        assert!(h.states().is_empty());
        assert_eq!(executor.pending(), 1);
    }

    #[test]
    fn stop_discards_in_flight_result() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 1, executor.clone());
        h.minimizer.start();
        h.minimizer.stop();
        assert_eq!(h.minimizer.state(), MinimizerState::Stopped);
        h.clear_states();

        executor.run_all();
        assert!(h.minimizer.wait_for_step());

        assert_eq!(h.minimizer.state(), MinimizerState::Stopped);
        assert!(h.states().is_empty());
        assert!(!h.minimizer.is_step_in_flight());
        assert_eq!(h.calls.step.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_then_start_restarts_after_stale_step() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        h.minimizer.start();
        h.minimizer.stop();
        h.clear_states();

        h.minimizer.start();
        assert_eq!(h.minimizer.state(), MinimizerState::Stopped);
        assert!(h.states().is_empty());
        assert_eq!(executor.pending(), 1);

        executor.run_all();
        h.minimizer.process_completions();

        // The stale step was discarded and a fresh one dispatched in its place.
        assert_eq!(h.states(), vec![MinimizerState::Running]);
        assert_eq!(executor.pending(), 1);
        assert!(h.minimizer.is_step_in_flight());

        executor.run_all();
        h.minimizer.process_completions();
        assert_eq!(h.minimizer.state(), MinimizerState::UpdateReady);
        assert_eq!(h.calls.step.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn queued_restart_without_molecule_fails_setup() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        h.minimizer.start();
        h.minimizer.stop();
        h.minimizer.set_molecule(None);
        h.clear_states();

        h.minimizer.start();
        assert_eq!(h.minimizer.state(), MinimizerState::SetupFailed);
        assert!(matches!(
            h.minimizer.last_setup_error(),
            Some(EngineError::NoMolecule)
        ));

        executor.run_all();
        h.minimizer.process_completions();

        assert_eq!(h.states(), vec![MinimizerState::SetupFailed]);
        assert_eq!(executor.pending(), 0);
        assert_eq!(h.calls.step.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queued_restart_runs_setup_only_when_stale_step_lands() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        h.minimizer.start();
        h.minimizer.stop();
        h.minimizer.set_forcefield("exp-6");
        h.clear_states();

        h.minimizer.start();
        assert!(h.states().is_empty());

        executor.run_all();
        h.minimizer.process_completions();

        assert_eq!(
            h.states(),
            vec![MinimizerState::SettingUp, MinimizerState::Running]
        );
        assert_eq!(h.minimizer.forcefield(), Some("exp-6"));
        assert_eq!(h.calls.setup.load(Ordering::SeqCst), 2);
        assert_eq!(executor.pending(), 1);
    }

    #[test]
    fn removing_molecule_while_running_discards_step() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 1, executor.clone());
        h.minimizer.start();
        h.minimizer.set_molecule(None);
        h.minimizer.start();
        assert_eq!(h.minimizer.state(), MinimizerState::SetupFailed);
        h.clear_states();

        executor.run_all();
        h.minimizer.process_completions();

        assert_eq!(h.minimizer.state(), MinimizerState::SetupFailed);
        assert!(h.states().is_empty());
        assert!(!h.minimizer.is_step_in_flight());
    }

    #[test]
    fn stop_cancels_queued_restart() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        h.minimizer.start();
        h.minimizer.stop();
        h.minimizer.start();
        h.minimizer.stop();

        executor.run_all();
        h.minimizer.process_completions();

        assert_eq!(h.minimizer.state(), MinimizerState::Stopped);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn unknown_forcefield_fails_setup_and_stays_dirty() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 3, executor.clone());
        h.minimizer.set_forcefield("bogus");

        h.minimizer.start();

        assert_eq!(
            h.states(),
            vec![MinimizerState::SettingUp, MinimizerState::SetupFailed]
        );
        assert!(h.minimizer.molecule_changed());
        assert!(matches!(
            h.minimizer.last_setup_error(),
            Some(EngineError::Forcefield { .. })
        ));
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn failed_setup_is_retried_on_next_start() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 3, executor.clone());
        h.minimizer.set_forcefield("bogus");
        h.minimizer.start();

        h.minimizer.set_forcefield("exp-6");
        h.minimizer.start();

        assert_eq!(h.minimizer.state(), MinimizerState::Running);
        assert_eq!(h.minimizer.forcefield(), Some("exp-6"));
        assert!(h.minimizer.last_setup_error().is_none());
        assert_eq!(executor.pending(), 1);
    }

    #[test]
    fn optimizer_setup_error_is_reported() {
        let executor: Arc<dyn StepExecutor> = Arc::new(InlineExecutor::new());
        let calls = Arc::new(Calls::default());
        let mut optimizer = FakeOptimizer::new(Arc::clone(&calls), 3);
        optimizer.fail_setup = true;
        let mut minimizer = EnergyMinimizer::new(Some(molecule()), optimizer, executor);

        minimizer.start();

        assert_eq!(minimizer.state(), MinimizerState::SetupFailed);
        assert!(minimizer.molecule_changed());
        assert!(matches!(
            minimizer.last_setup_error(),
            Some(EngineError::Setup(_))
        ));
    }

    #[test]
    fn set_forcefield_always_marks_dirty() {
        let mut h = inline_harness(5);
        h.minimizer.start();
        h.minimizer.process_completions();
        assert!(!h.minimizer.molecule_changed());

        h.minimizer.set_forcefield(DEFAULT_FORCEFIELD);
        assert!(h.minimizer.molecule_changed());

        h.minimizer.start();
        assert_eq!(h.calls.setup.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_molecule_marks_dirty_only_on_change() {
        let shared = molecule();
        let mut h = harness_with(Some(shared.clone()), 5, Arc::new(InlineExecutor::new()));
        h.minimizer.start();
        h.minimizer.process_completions();
        assert!(!h.minimizer.molecule_changed());

        h.minimizer.set_molecule(Some(shared.clone()));
        assert!(!h.minimizer.molecule_changed());

        h.minimizer.set_molecule(Some(molecule()));
        assert!(h.minimizer.molecule_changed());

        h.minimizer.set_molecule_changed(false);
        h.minimizer.set_molecule(None);
        assert!(h.minimizer.molecule_changed());
        assert!(h.minimizer.molecule().is_none());
    }

    #[test]
    fn set_molecule_changed_forces_setup() {
        let mut h = inline_harness(5);
        h.minimizer.start();
        h.minimizer.process_completions();

        h.minimizer.set_molecule_changed(true);
        h.clear_states();
        h.minimizer.start();

        assert_eq!(
            h.states(),
            vec![MinimizerState::SettingUp, MinimizerState::Running]
        );
        assert_eq!(h.calls.setup.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn repeated_stop_notifies_once() {
        let mut h = inline_harness(5);
        h.minimizer.start();
        h.minimizer.process_completions();
        h.clear_states();

        h.minimizer.stop();
        h.minimizer.stop();

        assert_eq!(h.states(), vec![MinimizerState::Stopped]);
    }

    #[test]
    fn wait_without_step_in_flight_returns_false() {
        let mut h = inline_harness(5);
        assert!(!h.minimizer.wait_for_step());
        assert!(!h.minimizer.wait_for_step_timeout(Duration::from_millis(10)));
        assert_eq!(h.minimizer.process_completions(), 0);
    }

    #[test]
    fn wait_with_timeout_gives_up_on_unfinished_step() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        h.minimizer.start();

        assert!(!h.minimizer.wait_for_step_timeout(Duration::from_millis(20)));
        assert_eq!(h.minimizer.state(), MinimizerState::Running);

        executor.run_all();
        assert!(h.minimizer.wait_for_step_timeout(Duration::from_secs(5)));
        assert_eq!(h.minimizer.state(), MinimizerState::UpdateReady);
    }

    #[test]
    fn optimizer_is_unavailable_while_step_in_flight() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        assert!(h.minimizer.optimizer().is_some());

        h.minimizer.start();
        assert!(h.minimizer.optimizer().is_none());

        executor.run_all();
        h.minimizer.process_completions();
        assert_eq!(h.minimizer.optimizer().map(|o| o.steps), Some(1));
    }

    #[test]
    fn dropping_minimizer_with_step_in_flight_is_harmless() {
        let executor = Arc::new(QueuedExecutor::default());
        let mut h = harness_with(Some(molecule()), 5, executor.clone());
        h.minimizer.start();
        drop(h.minimizer);

        executor.run_all();
        assert_eq!(h.calls.step.load(Ordering::SeqCst), 1);
    }
}
