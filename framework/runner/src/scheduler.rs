use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use sweep_core::prelude::{DirtyEnvironmentError, JobHandle, JobId, JobState, LaunchError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::census::ProcessCensus;
use crate::launch::{Invocation, JobLauncher};
use crate::progress::SweepProgress;
use crate::types::SweepResult;

#[derive(Debug, Clone)]
struct TrackedJob {
    id: JobId,
    run_name: String,
    state: JobState,
}

/// The jobs issued by one sweep and the watchers that confirm their completion.
///
/// Every running job is owned by a watcher task that holds one permit of the scheduler's pool.
/// The watcher polls the census for that job and gives the permit back once the job is no longer
/// active.
pub struct ActiveJobSet {
    jobs: Arc<Mutex<Vec<TrackedJob>>>,
    watchers: JoinSet<JobHandle>,
    census: Arc<dyn ProcessCensus>,
    poll_interval: Duration,
    progress: SweepProgress,
}

impl ActiveJobSet {
    fn new(census: Arc<dyn ProcessCensus>, poll_interval: Duration, progress: SweepProgress) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            watchers: JoinSet::new(),
            census,
            poll_interval,
            progress,
        }
    }

    fn register(&mut self, run_name: &str) -> JobId {
        let mut jobs = self.jobs.lock();
        let id = JobId(jobs.len() as u64);
        jobs.push(TrackedJob {
            id,
            run_name: run_name.to_string(),
            state: JobState::Pending,
        });
        id
    }

    fn track(&mut self, handle: JobHandle, permit: OwnedSemaphorePermit) {
        set_state(&self.jobs, handle.id, JobState::Running);

        let jobs = self.jobs.clone();
        let census = self.census.clone();
        let poll_interval = self.poll_interval;
        let progress = self.progress.clone();
        self.watchers.spawn(async move {
            // Hold the permit until the job is confirmed complete
            let _permit = permit;

            loop {
                tokio::time::sleep(poll_interval).await;
                match census.is_active(&handle) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => log::warn!("Could not check whether {handle} is active: {e}"),
                }
            }

            log::debug!("{handle} completed");
            set_state(&jobs, handle.id, JobState::Completed);
            progress.job_completed();
            handle
        });
    }

    /// Wait for the next watcher to confirm a completion. Returns [None] once every issued job
    /// is confirmed complete.
    pub(crate) async fn join_next(&mut self) -> Option<SweepResult<JobHandle>> {
        self.watchers
            .join_next()
            .await
            .map(|joined| joined.context("Job watcher task failed"))
    }

    /// The number of jobs issued so far.
    pub fn issued(&self) -> usize {
        self.jobs.lock().len()
    }

    /// The number of jobs that are launched and not yet confirmed complete.
    pub fn running(&self) -> usize {
        self.count(JobState::Running)
    }

    /// The number of jobs confirmed complete.
    pub fn completed(&self) -> usize {
        self.count(JobState::Completed)
    }

    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.jobs
            .lock()
            .iter()
            .find(|job| job.id == id)
            .map(|job| job.state)
    }

    /// The run names of all issued jobs, in launch order.
    pub fn run_names(&self) -> Vec<String> {
        self.jobs.lock().iter().map(|j| j.run_name.clone()).collect()
    }

    fn count(&self, state: JobState) -> usize {
        self.jobs.lock().iter().filter(|j| j.state == state).count()
    }
}

fn set_state(jobs: &Mutex<Vec<TrackedJob>>, id: JobId, state: JobState) {
    if let Some(job) = jobs.lock().iter_mut().find(|job| job.id == id) {
        job.state = state;
    }
}

/// Launches one job per invocation, in order, with at most `limit` jobs active at a time.
///
/// The in-process bound is a pool of `limit` permits. Before a permit is used to launch a job, the
/// census must also report fewer than `limit` active jobs, so that jobs the watchers have not yet
/// seen finish are still accounted for.
pub struct Scheduler {
    census: Arc<dyn ProcessCensus>,
    launcher: Arc<dyn JobLauncher>,
    limit: usize,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        census: Arc<dyn ProcessCensus>,
        launcher: Arc<dyn JobLauncher>,
        limit: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            census,
            launcher,
            limit: limit.max(1),
            poll_interval,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Fail with a [DirtyEnvironmentError] if any job is already active in the census namespace.
    pub fn preflight(&self) -> SweepResult<()> {
        let active = self
            .census
            .active_count()
            .context("Failed to count active jobs before starting")?;
        if active != 0 {
            return Err(DirtyEnvironmentError::new(self.census.namespace(), active).into());
        }
        log::debug!("No active jobs in '{}'", self.census.namespace());
        Ok(())
    }

    /// Launch every invocation, in order.
    ///
    /// Returns once the last job has been launched. Jobs may still be running, use
    /// [crate::wait::CompletionWaiter] to wait for them. A job that fails to launch ends the sweep
    /// with an error carrying a [LaunchError].
    pub async fn launch_all(
        &self,
        invocations: &[Invocation],
        progress: SweepProgress,
    ) -> SweepResult<ActiveJobSet> {
        self.preflight()?;

        let pool = Arc::new(Semaphore::new(self.limit));
        let mut active = ActiveJobSet::new(self.census.clone(), self.poll_interval, progress);

        log::info!(
            "Running {} job(s) (at most {} in parallel)...",
            invocations.len(),
            self.limit
        );
        for (index, invocation) in invocations.iter().enumerate() {
            let id = active.register(&invocation.run_name);
            let permit = pool
                .clone()
                .acquire_owned()
                .await
                .context("Job pool closed")?;
            self.wait_for_capacity().await?;

            log::info!(
                "Starting run {} out of {}: {}",
                index + 1,
                invocations.len(),
                invocation.run_name
            );
            let handle = self
                .launcher
                .launch(id, invocation)
                .with_context(|| LaunchError::new(&invocation.run_name))?;
            active.track(handle, permit);
        }

        Ok(active)
    }

    /// Poll the census until it reports fewer than `limit` active jobs.
    async fn wait_for_capacity(&self) -> SweepResult<()> {
        loop {
            let active = self
                .census
                .active_count()
                .context("Failed to count active jobs")?;
            if active < self.limit {
                return Ok(());
            }
            log::debug!("{active} job(s) active, waiting for capacity");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
