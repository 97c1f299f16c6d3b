use std::future::Future;

use anyhow::Context;

use crate::types::SweepResult;

/// Owns the async runtime that drives the scheduler and the job watchers.
///
/// The sweep itself is coordinated from a single thread. The runtime is only needed so that the
/// watchers of launched jobs can poll concurrently with the launch loop.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub(crate) fn new() -> SweepResult<Self> {
        let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        Ok(Self { runtime })
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// There is no cancellation. A future that never completes, for example waiting on a job that
    /// never exits, blocks the sweep.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        self.runtime.block_on(fut)
    }
}
