mod census;
mod cli;
mod context;
mod definition;
mod descriptor;
mod executor;
mod init;
mod launch;
mod materialize;
mod postprocess;
mod progress;
mod report;
mod run;
mod scheduler;
mod template;
mod tool_path;
mod types;
mod wait;

pub mod testing;

pub mod prelude {
    pub use crate::census::{CensusError, ProcessCensus, ProcessTableCensus, ScreenCensus};
    pub use crate::cli::{Backend, SweepCli};
    pub use crate::context::SweepContext;
    pub use crate::definition::{HookResult, SweepDefinition, SweepDefinitionBuilder};
    pub use crate::descriptor::RunDescriptorBuilder;
    pub use crate::launch::{
        Invocation, JobLauncher, ProcessLauncher, ScreenLauncher, SimulatorCommand,
    };
    pub use crate::materialize::{ConfigMaterializer, RunLayout};
    pub use crate::postprocess::{AnalysisRequest, AnalysisTool, ExternalAnalysisTool, PostProcessor};
    pub use crate::progress::SweepProgress;
    pub use crate::report::{PostProcessReport, RunOutcome};
    pub use crate::run::{run, run_with, Collaborators};
    pub use crate::scheduler::{ActiveJobSet, Scheduler};
    pub use crate::template::{substitute, unresolved_tokens, Substitution, TemplateError};
    pub use crate::tool_path::{SWEEP_ANALYSIS_PATH_ENV, SWEEP_SIMULATOR_PATH_ENV};
    pub use crate::types::SweepResult;
    pub use crate::wait::CompletionWaiter;

    pub use sweep_core::prelude::*;
}
