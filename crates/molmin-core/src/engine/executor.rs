use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::warn;

/// A unit of background work: one optimizer step plus the hand-back of its result.
pub type StepJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs step jobs off the caller's thread.
///
/// Implementations must eventually run every job they accept exactly once;
/// the minimizer gets its optimizer back only through the job.
pub trait StepExecutor: Send + Sync {
    fn execute(&self, job: StepJob);
}

/// Runs jobs on a rayon thread pool.
#[derive(Debug, Clone, Default)]
pub struct RayonExecutor {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl RayonExecutor {
    /// Uses rayon's global pool.
    pub fn global() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: Arc<rayon::ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Creates a dedicated pool with `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("molmin-step-{}", i))
            .build()?;
        Ok(Self::with_pool(Arc::new(pool)))
    }
}

impl StepExecutor for RayonExecutor {
    fn execute(&self, job: StepJob) {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }
}

/// Runs every job on a freshly spawned, named OS thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadExecutor;

impl ThreadExecutor {
    pub fn new() -> Self {
        Self
    }
}

fn take_job(slot: &Mutex<Option<StepJob>>) -> Option<StepJob> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl StepExecutor for ThreadExecutor {
    fn execute(&self, job: StepJob) {
        let slot = Arc::new(Mutex::new(Some(job)));
        let worker_slot = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name("molmin-step".to_string())
            .spawn(move || {
                if let Some(job) = take_job(&worker_slot) {
                    job();
                }
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn step thread; running the step inline.");
            if let Some(job) = take_job(&slot) {
                job();
            }
        }
    }
}

/// Runs each job synchronously inside `execute`.
///
/// The step completes before `execute` returns, but its result is still only
/// observed when the minimizer drains completions.
#[derive(Debug, Clone, Default)]
pub struct InlineExecutor;

impl InlineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl StepExecutor for InlineExecutor {
    fn execute(&self, job: StepJob) {
        job();
    }
}
