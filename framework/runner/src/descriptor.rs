use std::collections::HashSet;

use sweep_core::prelude::{RawRun, RunDescriptor, SweepConstants};

/// Expands the configured run list into the runs that are actually executed.
///
/// Entries that only differ in their transport protocol describe the same simulator run, so only
/// the first of them is kept. The output keeps the order of first occurrence.
#[derive(Debug, Clone)]
pub struct RunDescriptorBuilder {
    constants: SweepConstants,
}

impl RunDescriptorBuilder {
    pub fn new(constants: SweepConstants) -> Self {
        Self { constants }
    }

    pub fn build(&self, runs: &[RawRun]) -> Vec<RunDescriptor> {
        let mut seen = HashSet::with_capacity(runs.len());
        let mut names = HashSet::with_capacity(runs.len());

        runs.iter()
            .filter(|raw| {
                let fresh = seen.insert(raw.dedup_key());
                if !fresh {
                    log::debug!(
                        "Skipping duplicate run {} -> {} ({}) on {}",
                        raw.from_id,
                        raw.to_id,
                        raw.protocol,
                        raw.satellite_network
                    );
                }
                fresh
            })
            .map(|raw| RunDescriptor::from_raw(raw, &self.constants))
            .inspect(|descriptor| {
                if !names.insert(descriptor.name.clone()) {
                    // Same topology family and pair on two networks. The run directories collide.
                    log::warn!("Run name {} is used by more than one run", descriptor.name);
                }
            })
            .collect()
    }
}
