//! Deterministic stand-ins for the external simulator, its process census and the analysis tool.
//!
//! A [FakeCluster] shares one state between its census and its launcher. Launched jobs stay active
//! for a scripted number of `is_active` polls, so tests can drive the scheduler without starting
//! real processes. A lingering job is still counted by `active_count` for a few polls after its
//! own probe reported it done, like a session that takes a moment to close.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use sweep_core::prelude::{JobHandle, JobId, JobTarget};

use crate::census::{CensusError, ProcessCensus};
use crate::launch::{Invocation, JobLauncher};
use crate::postprocess::{AnalysisRequest, AnalysisTool};
use crate::types::SweepResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    Launched(String),
    Completed(String),
    /// A lingering job stopped being counted.
    Released(String),
}

#[derive(Debug, Default)]
struct ClusterState {
    default_polls: u32,
    durations: HashMap<String, u32>,
    lingering: HashMap<String, u32>,
    failing_launches: HashSet<String>,
    foreign_jobs: usize,
    probe_failures: usize,
    running: HashMap<String, u32>,
    closing: HashMap<String, u32>,
    launched: Vec<String>,
    events: Vec<ClusterEvent>,
    max_active: usize,
}

impl ClusterState {
    fn active(&self) -> usize {
        self.running.len() + self.closing.len() + self.foreign_jobs
    }

    /// Count the active jobs, then age the lingering ones by one poll.
    fn poll_active(&mut self) -> usize {
        let active = self.active();

        let mut released = Vec::new();
        self.closing.retain(|name, remaining| {
            *remaining -= 1;
            if *remaining == 0 {
                released.push(name.clone());
            }
            *remaining > 0
        });
        released.sort();
        self.events
            .extend(released.into_iter().map(ClusterEvent::Released));

        active
    }
}

#[derive(Debug, Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl FakeCluster {
    /// Jobs stay active for `default_polls` polls unless given their own duration.
    pub fn new(default_polls: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClusterState {
                default_polls,
                ..Default::default()
            })),
        }
    }

    pub fn with_duration(self, run_name: &str, polls: u32) -> Self {
        self.state
            .lock()
            .durations
            .insert(run_name.to_string(), polls);
        self
    }

    /// Keep counting `run_name` in `active_count` for `polls` counts after it completes.
    pub fn with_lingering(self, run_name: &str, polls: u32) -> Self {
        self.state
            .lock()
            .lingering
            .insert(run_name.to_string(), polls);
        self
    }

    /// Jobs that belong to someone else and never finish.
    pub fn with_foreign_jobs(self, count: usize) -> Self {
        self.state.lock().foreign_jobs = count;
        self
    }

    pub fn with_failing_launch(self, run_name: &str) -> Self {
        self.state
            .lock()
            .failing_launches
            .insert(run_name.to_string());
        self
    }

    /// The next `count` `is_active` probes fail.
    pub fn with_probe_failures(self, count: usize) -> Self {
        self.state.lock().probe_failures = count;
        self
    }

    pub fn census(&self) -> FakeCensus {
        FakeCensus {
            state: self.state.clone(),
        }
    }

    pub fn launcher(&self) -> FakeLauncher {
        FakeLauncher {
            state: self.state.clone(),
        }
    }

    /// Names of the successfully launched runs, in launch order.
    pub fn launched(&self) -> Vec<String> {
        self.state.lock().launched.clone()
    }

    pub fn events(&self) -> Vec<ClusterEvent> {
        self.state.lock().events.clone()
    }

    /// The highest number of simultaneously active jobs seen.
    pub fn max_active(&self) -> usize {
        self.state.lock().max_active
    }

    pub fn active(&self) -> usize {
        self.state.lock().active()
    }
}

#[derive(Debug, Clone)]
pub struct FakeCensus {
    state: Arc<Mutex<ClusterState>>,
}

impl ProcessCensus for FakeCensus {
    fn namespace(&self) -> &str {
        "fake-cluster"
    }

    fn active_count(&self) -> Result<usize, CensusError> {
        Ok(self.state.lock().poll_active())
    }

    fn is_active(&self, job: &JobHandle) -> Result<bool, CensusError> {
        let mut state = self.state.lock();
        if state.probe_failures > 0 {
            state.probe_failures -= 1;
            return Err(CensusError::Probe {
                command: "fake probe".to_string(),
                source: std::io::Error::other("probe unavailable"),
            });
        }

        let Some(remaining) = state.running.get_mut(&job.run_name) else {
            return Ok(false);
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return Ok(true);
        }

        state.running.remove(&job.run_name);
        state
            .events
            .push(ClusterEvent::Completed(job.run_name.clone()));
        if let Some(polls) = state.lingering.get(&job.run_name).copied() {
            if polls > 0 {
                state.closing.insert(job.run_name.clone(), polls);
            }
        }
        Ok(false)
    }
}

#[derive(Debug, Clone)]
pub struct FakeLauncher {
    state: Arc<Mutex<ClusterState>>,
}

impl JobLauncher for FakeLauncher {
    fn launch(&self, id: JobId, invocation: &Invocation) -> SweepResult<JobHandle> {
        let mut state = self.state.lock();
        let name = &invocation.run_name;
        if state.failing_launches.contains(name) {
            return Err(anyhow!("No such file or directory"));
        }

        let polls = state
            .durations
            .get(name)
            .copied()
            .unwrap_or(state.default_polls)
            .max(1);
        state.running.insert(name.clone(), polls);
        state.launched.push(name.clone());
        state.events.push(ClusterEvent::Launched(name.clone()));
        state.max_active = state.max_active.max(state.active());

        Ok(JobHandle::new(
            id,
            name,
            JobTarget::Session(format!("fake-{name}")),
        ))
    }
}

/// Records every analysis request and fails the ones it was told to.
#[derive(Debug, Clone, Default)]
pub struct FakeAnalysis {
    failing: Arc<Mutex<HashSet<String>>>,
    requests: Arc<Mutex<Vec<AnalysisRequest>>>,
}

impl FakeAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing(self, run_name: &str) -> Self {
        self.failing.lock().insert(run_name.to_string());
        self
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().clone()
    }
}

impl AnalysisTool for FakeAnalysis {
    fn analyse(&self, request: &AnalysisRequest) -> SweepResult<()> {
        self.requests.lock().push(request.clone());
        if self.failing.lock().contains(&request.run_name) {
            return Err(anyhow!("Analysis tool exited with exit status: 1"));
        }
        Ok(())
    }
}
