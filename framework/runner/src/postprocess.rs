use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use sweep_core::prelude::RunDescriptor;

use crate::materialize::RunLayout;
use crate::report::{PostProcessReport, RunOutcome};
use crate::types::SweepResult;

/// The arguments of one analysis invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub run_name: String,
    pub logs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub from_id: u32,
    pub to_id: u32,
    pub interval_ns: u64,
}

impl AnalysisRequest {
    /// Positional arguments, in the order the analysis tool expects them.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            self.logs_dir.clone().into_os_string(),
            self.data_dir.clone().into_os_string(),
            self.pdf_dir.clone().into_os_string(),
            self.from_id.to_string().into(),
            self.to_id.to_string().into(),
            self.interval_ns.to_string().into(),
        ]
    }
}

/// Turns the logs of one finished run into derived data and rendered plots.
pub trait AnalysisTool: Send + Sync {
    fn analyse(&self, request: &AnalysisRequest) -> SweepResult<()>;
}

/// Runs an external analysis program and waits for it to exit.
///
/// A non-zero exit status is an error.
#[derive(Debug, Clone)]
pub struct ExternalAnalysisTool {
    program: PathBuf,
    leading_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ExternalAnalysisTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Arguments passed before the standard ones, for example the script an interpreter runs.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    pub fn with_working_dir(mut self, working_dir: Option<PathBuf>) -> Self {
        self.working_dir = working_dir;
        self
    }
}

impl AnalysisTool for ExternalAnalysisTool {
    fn analyse(&self, request: &AnalysisRequest) -> SweepResult<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(request.args())
            .stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        log::debug!("Running analysis for {}: {:?}", request.run_name, command);
        let output = command
            .output()
            .with_context(|| format!("Failed to start '{}'", self.program.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            );
        }
        log::trace!(
            "Analysis output for {}: {}",
            request.run_name,
            String::from_utf8_lossy(&output.stdout)
        );

        Ok(())
    }
}

/// Runs the analysis tool once per run, in descriptor order.
///
/// A failing run is recorded in the report and never stops the remaining runs from being
/// processed.
pub struct PostProcessor {
    layout: RunLayout,
    tool: Box<dyn AnalysisTool>,
}

impl PostProcessor {
    pub fn new(layout: RunLayout, tool: Box<dyn AnalysisTool>) -> Self {
        Self { layout, tool }
    }

    pub fn run(&self, descriptors: &[RunDescriptor]) -> PostProcessReport {
        log::info!("Post-processing {} run(s)...", descriptors.len());

        let mut report = PostProcessReport::default();
        for descriptor in descriptors {
            let result = self.process(descriptor);
            if let Err(e) = &result {
                log::error!("----U");
                log::error!("Post-processing failed for {descriptor}: {e:?}");
                log::error!("----D");
            }
            report.push(RunOutcome {
                run_name: descriptor.name.clone(),
                from_id: descriptor.from_id,
                to_id: descriptor.to_id,
                result,
            });
        }

        report
    }

    fn process(&self, descriptor: &RunDescriptor) -> SweepResult<()> {
        let name = &descriptor.name;
        // The tool may run from another working directory
        let request = AnalysisRequest {
            run_name: name.clone(),
            logs_dir: absolute(&self.layout.logs_dir(name))?,
            data_dir: absolute(&self.layout.data_out_dir(name))?,
            pdf_dir: absolute(&self.layout.pdf_out_dir(name))?,
            from_id: descriptor.from_id,
            to_id: descriptor.to_id,
            interval_ns: descriptor.pingmesh_interval_ns,
        };

        for dir in [&request.data_dir, &request.pdf_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
        }

        self.tool
            .analyse(&request)
            .with_context(|| format!("Analysis of '{name}' failed"))
    }
}

fn absolute(path: &Path) -> SweepResult<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve '{}'", path.display()))
}
