use std::collections::HashMap;

use sweep_core::prelude::{RawRun, SweepConstants};

use crate::materialize::RunLayout;

/// State of a sweep that the setup hook can read and adjust before any run is materialized.
#[derive(Debug)]
pub struct SweepContext {
    sweep_name: String,
    constants: SweepConstants,
    runs: Vec<RawRun>,
    layout: RunLayout,
    summary_env: HashMap<String, String>,
}

impl SweepContext {
    pub(crate) fn new(
        sweep_name: String,
        constants: SweepConstants,
        runs: Vec<RawRun>,
        layout: RunLayout,
    ) -> Self {
        Self {
            sweep_name,
            constants,
            runs,
            layout,
            summary_env: HashMap::with_capacity(0),
        }
    }

    pub fn sweep_name(&self) -> &str {
        &self.sweep_name
    }

    pub fn constants(&self) -> &SweepConstants {
        &self.constants
    }

    pub fn constants_mut(&mut self) -> &mut SweepConstants {
        &mut self.constants
    }

    /// The raw runs of the sweep, before deduplication.
    pub fn runs(&self) -> &[RawRun] {
        &self.runs
    }

    pub fn runs_mut(&mut self) -> &mut Vec<RawRun> {
        &mut self.runs
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Record a value in the sweep summary, for example a derived constant the runs depend on.
    ///
    /// Recorded values are part of the summary fingerprint.
    pub fn add_summary_env(&mut self, key: impl Into<String>, value: impl ToString) {
        self.summary_env.insert(key.into(), value.to_string());
    }

    pub(crate) fn summary_env(&self) -> &HashMap<String, String> {
        &self.summary_env
    }
}
