use serde::{Deserialize, Serialize};

/// Identifier of a job issued by the scheduler, unique within one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a job as seen by the orchestrator.
///
/// There is no failed state. Whether a run produced anything useful is only decided when its
/// output is post-processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Completed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "Pending"),
            JobState::Running => write!(f, "Running"),
            JobState::Completed => write!(f, "Completed"),
        }
    }
}

/// How a process census can find a launched job again.
///
/// The launched process is detached, so this is the only link the orchestrator keeps to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobTarget {
    /// A named session in a terminal multiplexer.
    Session(String),
    /// An operating system process id.
    Pid(u32),
}

impl std::fmt::Display for JobTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobTarget::Session(name) => write!(f, "session {name}"),
            JobTarget::Pid(pid) => write!(f, "pid {pid}"),
        }
    }
}

/// Handle to one launched job, tied to the run it executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: JobId,
    pub run_name: String,
    pub target: JobTarget,
}

impl JobHandle {
    pub fn new(id: JobId, run_name: impl Into<String>, target: JobTarget) -> Self {
        Self {
            id,
            run_name: run_name.into(),
            target,
        }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job {} [{}] ({})", self.id, self.run_name, self.target)
    }
}
