mod descriptor;
mod dirty;
mod job;
mod launch;

pub mod prelude {
    pub use crate::descriptor::{DedupKey, RawRun, RunDescriptor, SweepConstants};
    pub use crate::dirty::DirtyEnvironmentError;
    pub use crate::job::{JobHandle, JobId, JobState, JobTarget};
    pub use crate::launch::LaunchError;
}
