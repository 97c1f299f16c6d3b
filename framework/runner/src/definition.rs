use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use sweep_core::prelude::{RawRun, SweepConstants};

use crate::cli::SweepCli;
use crate::context::SweepContext;
use crate::materialize::RunLayout;
use crate::types::SweepResult;

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut = fn(&mut SweepContext) -> HookResult;

/// The builder for a sweep definition.
///
/// This must be used in the `main` function of a sweep to declare the runs that you want to
/// execute.
pub struct SweepDefinitionBuilder {
    /// The name of the sweep, which should be unique on the host running it.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// This value is initialised for you and you cannot change it.
    #[doc(hidden)]
    cli: SweepCli,
    /// Values shared by every run of the sweep.
    constants: SweepConstants,
    /// The raw runs, which may contain duplicates that differ only by protocol.
    runs: Vec<RawRun>,
    /// The concurrency limit used when `--max-processes` is not given.
    default_max_processes: usize,
    /// Global setup hook for this sweep. It will be run once, before any run is materialized.
    setup_fn: Option<GlobalHookMut>,
}

pub struct SweepDefinition {
    pub name: String,
    pub cli: SweepCli,
    pub constants: SweepConstants,
    pub runs: Vec<RawRun>,
    pub max_processes: usize,
    pub setup_fn: Option<GlobalHookMut>,
}

impl SweepDefinitionBuilder {
    /// Initialise a new sweep definition from the sweep name and already parsed command line
    /// arguments. See the [SweepDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: SweepCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            constants: SweepConstants::default(),
            runs: Vec::new(),
            default_max_processes: 1,
            setup_fn: None,
        }
    }

    /// Initialise logging, parse the command line and create a new sweep definition.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    pub fn with_constants(mut self, constants: SweepConstants) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_runs(mut self, runs: Vec<RawRun>) -> Self {
        self.runs = runs;
        self
    }

    pub fn add_run(mut self, run: RawRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Set the concurrency limit that is used when none is given on the command line.
    pub fn with_default_max_processes(mut self, max_processes: usize) -> Self {
        self.default_max_processes = max_processes;
        self
    }

    /// Set the global setup hook [SweepDefinitionBuilder::setup_fn] for this sweep.
    pub fn use_setup(mut self, setup_fn: fn(&mut SweepContext) -> HookResult) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    pub(crate) fn build(self) -> SweepResult<SweepDefinition> {
        let max_processes = self.cli.max_processes.unwrap_or(self.default_max_processes);
        if max_processes == 0 {
            bail!("The maximum number of processes must be at least 1");
        }
        if self.cli.poll_interval_ms == 0 {
            bail!("The poll interval must be at least 1 ms");
        }

        Ok(SweepDefinition {
            name: self.name,
            cli: self.cli,
            constants: self.constants,
            runs: self.runs,
            max_processes,
            setup_fn: self.setup_fn,
        })
    }
}

impl SweepDefinition {
    pub fn layout(&self) -> RunLayout {
        RunLayout::new(
            self.cli.runs_dir.clone(),
            self.cli.data_dir.clone(),
            self.cli.pdf_dir.clone(),
        )
    }

    pub fn template_path(&self) -> PathBuf {
        self.cli.template.clone()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.cli.poll_interval_ms)
    }

    /// The namespace that this sweep's sessions are counted in.
    pub fn session_prefix(&self) -> &str {
        self.cli.session_prefix.as_deref().unwrap_or(&self.name)
    }
}
