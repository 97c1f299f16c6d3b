use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sweep_core::prelude::JobHandle;

use crate::census::ProcessCensus;
use crate::scheduler::ActiveJobSet;
use crate::types::SweepResult;

/// Blocks until no launched job remains active.
///
/// There is no deadline. A job that never exits keeps the sweep waiting.
pub struct CompletionWaiter {
    census: Arc<dyn ProcessCensus>,
    poll_interval: Duration,
}

impl CompletionWaiter {
    pub fn new(census: Arc<dyn ProcessCensus>, poll_interval: Duration) -> Self {
        Self {
            census,
            poll_interval,
        }
    }

    /// Wait for every job in `active` to be confirmed complete, then for the census to report no
    /// active jobs at all.
    ///
    /// Returns the handles in the order their completion was confirmed.
    pub async fn wait(&self, mut active: ActiveJobSet) -> SweepResult<Vec<JobHandle>> {
        log::info!("Waiting for {} job(s) to finish...", active.running());

        let mut completed = Vec::with_capacity(active.issued());
        while let Some(handle) = active.join_next().await {
            completed.push(handle?);
        }
        log::debug!("All {} issued job(s) confirmed complete", completed.len());

        loop {
            let remaining = self
                .census
                .active_count()
                .context("Failed to count active jobs while waiting for completion")?;
            if remaining == 0 {
                break;
            }
            log::debug!("{remaining} job(s) still active in '{}'", self.census.namespace());
            tokio::time::sleep(self.poll_interval).await;
        }

        log::info!("All jobs finished");
        Ok(completed)
    }
}
