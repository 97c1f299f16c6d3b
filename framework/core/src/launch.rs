/// Attached as context to the error of a launch that failed to start.
///
/// A launch failure is fatal for the sweep. Nothing is retried and nothing that was already
/// launched is cleaned up.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("Failed to launch run '{run}'")]
pub struct LaunchError {
    pub run: String,
}

impl LaunchError {
    pub fn new(run: impl Into<String>) -> Self {
        Self { run: run.into() }
    }
}
