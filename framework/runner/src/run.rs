use std::sync::Arc;

use anyhow::Context;
use sweep_summary_model::{append_sweep_summary, SweepSummary};

use crate::census::{ProcessCensus, ProcessTableCensus, ScreenCensus};
use crate::cli::Backend;
use crate::context::SweepContext;
use crate::definition::{SweepDefinition, SweepDefinitionBuilder};
use crate::descriptor::RunDescriptorBuilder;
use crate::executor::Executor;
use crate::launch::{Invocation, JobLauncher, ProcessLauncher, ScreenLauncher, SimulatorCommand};
use crate::materialize::ConfigMaterializer;
use crate::postprocess::{AnalysisTool, ExternalAnalysisTool, PostProcessor};
use crate::progress::SweepProgress;
use crate::report::PostProcessReport;
use crate::scheduler::Scheduler;
use crate::tool_path::{analysis_path, simulator_path};
use crate::types::SweepResult;
use crate::wait::CompletionWaiter;

/// The external systems a sweep talks to.
pub struct Collaborators {
    pub census: Arc<dyn ProcessCensus>,
    pub launcher: Arc<dyn JobLauncher>,
    pub analysis: Box<dyn AnalysisTool>,
}

impl Collaborators {
    /// Pick the census and launcher for the configured backend and locate the external tools.
    pub fn from_definition(definition: &SweepDefinition) -> SweepResult<Self> {
        let cli = &definition.cli;
        let program = simulator_path()?;
        let simulator =
            SimulatorCommand::new(program.clone()).with_working_dir(cli.simulator_dir.clone());

        let (census, launcher): (Arc<dyn ProcessCensus>, Arc<dyn JobLauncher>) = match cli.backend
        {
            Backend::Screen => {
                let prefix = definition.session_prefix();
                (
                    Arc::new(ScreenCensus::new(prefix)),
                    Arc::new(ScreenLauncher::new(simulator, prefix)),
                )
            }
            Backend::Process => {
                let program_name = program
                    .file_name()
                    .with_context(|| format!("Invalid simulator path '{}'", program.display()))?;
                (
                    Arc::new(ProcessTableCensus::new(program_name)),
                    Arc::new(ProcessLauncher::new(simulator)),
                )
            }
        };

        let analysis = ExternalAnalysisTool::new(analysis_path()?)
            .with_leading_args(cli.analysis_args.clone())
            .with_working_dir(cli.analysis_dir.clone());

        Ok(Self {
            census,
            launcher,
            analysis: Box::new(analysis),
        })
    }
}

/// Run a sweep against the real simulator and analysis tool.
pub fn run(definition: SweepDefinitionBuilder) -> SweepResult<PostProcessReport> {
    let definition = definition.build()?;
    let collaborators = Collaborators::from_definition(&definition)?;

    run_definition(definition, collaborators)
}

/// Run a sweep with the given collaborators.
pub fn run_with(
    definition: SweepDefinitionBuilder,
    collaborators: Collaborators,
) -> SweepResult<PostProcessReport> {
    run_definition(definition.build()?, collaborators)
}

fn run_definition(
    definition: SweepDefinition,
    collaborators: Collaborators,
) -> SweepResult<PostProcessReport> {
    log::info!("Running sweep: {}", definition.name);
    let started_at = chrono::Utc::now().timestamp();

    let executor = Executor::new()?;
    let layout = definition.layout();
    let mut context = SweepContext::new(
        definition.name.clone(),
        definition.constants.clone(),
        definition.runs.clone(),
        layout.clone(),
    );

    if let Some(setup_fn) = definition.setup_fn {
        setup_fn(&mut context)?;
    }

    let descriptors = RunDescriptorBuilder::new(context.constants().clone()).build(context.runs());
    log::info!(
        "{} run(s) configured, {} after removing duplicates",
        context.runs().len(),
        descriptors.len()
    );

    let poll_interval = definition.poll_interval();
    let scheduler = Scheduler::new(
        collaborators.census.clone(),
        collaborators.launcher,
        definition.max_processes,
        poll_interval,
    );
    // Nothing may be touched on disk while another sweep is active
    scheduler.preflight()?;

    if definition.cli.keep_outputs {
        layout.ensure()?;
    } else {
        layout.reset()?;
    }

    let materializer = ConfigMaterializer::new(layout.clone(), definition.template_path())
        .strict(definition.cli.strict_templates);
    let invocations = descriptors
        .iter()
        .map(|descriptor| {
            materializer.materialize(descriptor)?;
            Invocation::for_descriptor(descriptor, &layout)
        })
        .collect::<SweepResult<Vec<_>>>()?;

    let progress = SweepProgress::new(invocations.len(), definition.cli.no_progress);
    let waiter = CompletionWaiter::new(collaborators.census, poll_interval);
    executor.execute_in_place(async {
        let active = scheduler.launch_all(&invocations, progress.clone()).await?;
        waiter.wait(active).await
    })?;
    progress.finish();

    let report = PostProcessor::new(layout, collaborators.analysis).run(&descriptors);
    report.print_summary();

    let mut summary = SweepSummary::new(
        definition
            .cli
            .run_id
            .clone()
            .unwrap_or_else(|| nanoid::nanoid!()),
        definition.name.clone(),
        started_at,
        definition.max_processes,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    for outcome in &report.outcomes {
        summary.push_run(outcome.to_summary());
    }
    for (key, value) in context.summary_env() {
        summary.add_env(key.clone(), value.clone());
    }

    // The sweep has completed, a summary that cannot be written does not fail it
    match append_sweep_summary(&summary, &definition.cli.summary_file) {
        Ok(()) => log::info!(
            "Sweep summary {} written to '{}'",
            summary.fingerprint(),
            definition.cli.summary_file.display()
        ),
        Err(e) => log::error!("Failed to write the sweep summary: {e:?}"),
    }

    Ok(report)
}
