use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use sweep_core::prelude::{JobHandle, JobId, JobTarget, RunDescriptor};

use crate::census::ScreenCensus;
use crate::materialize::RunLayout;
use crate::types::SweepResult;

/// The simulator binary and where to run it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorCommand {
    pub program: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl SimulatorCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, working_dir: Option<PathBuf>) -> Self {
        self.working_dir = working_dir;
        self
    }
}

/// Everything needed to start the simulator for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub run_name: String,
    /// Absolute, since the simulator may run from another working directory.
    pub run_dir: PathBuf,
    pub console_log: PathBuf,
}

impl Invocation {
    /// Build the invocation for a descriptor whose run directory has already been materialized.
    pub fn for_descriptor(descriptor: &RunDescriptor, layout: &RunLayout) -> SweepResult<Self> {
        let run_dir = layout
            .run_dir(&descriptor.name)
            .canonicalize()
            .with_context(|| format!("Run directory for '{}' does not exist", descriptor.name))?;
        let console_log = layout
            .logs_dir(&descriptor.name)
            .canonicalize()
            .with_context(|| format!("Logs directory for '{}' does not exist", descriptor.name))?
            .join(crate::materialize::CONSOLE_LOG_NAME);

        Ok(Self {
            run_name: descriptor.name.clone(),
            run_dir,
            console_log,
        })
    }

    /// The argument that points the simulator at the run directory.
    pub fn run_dir_arg(&self) -> String {
        format!("--run_dir={}", self.run_dir.display())
    }
}

/// Starts a run as a detached job.
///
/// The launched process outlives the handle. Only a [crate::census::ProcessCensus] can tell
/// whether it is still running.
pub trait JobLauncher: Send + Sync {
    fn launch(&self, id: JobId, invocation: &Invocation) -> SweepResult<JobHandle>;
}

/// Launches each run inside its own detached `screen` session.
#[derive(Debug, Clone)]
pub struct ScreenLauncher {
    simulator: SimulatorCommand,
    session_prefix: String,
}

impl ScreenLauncher {
    pub fn new(simulator: SimulatorCommand, session_prefix: impl Into<String>) -> Self {
        Self {
            simulator,
            session_prefix: session_prefix.into(),
        }
    }

    /// The shell command the session runs: the simulator with its output copied to the console
    /// log.
    pub fn shell_command(&self, invocation: &Invocation) -> SweepResult<String> {
        let program = self.simulator.program.to_string_lossy();
        let run_dir_arg = invocation.run_dir_arg();
        let console_log = invocation.console_log.to_string_lossy();

        let simulator = shlex::try_join([program.as_ref(), run_dir_arg.as_str()])
            .context("Simulator command cannot be quoted for the shell")?;
        let console_log =
            shlex::try_quote(&console_log).context("Console log path cannot be quoted")?;
        let run = format!("{simulator} 2>&1 | tee {console_log}");

        match &self.simulator.working_dir {
            Some(dir) => {
                let dir = dir.to_string_lossy();
                let dir = shlex::try_quote(&dir).context("Working directory cannot be quoted")?;
                Ok(format!("cd {dir} && {run}"))
            }
            None => Ok(run),
        }
    }
}

impl JobLauncher for ScreenLauncher {
    fn launch(&self, id: JobId, invocation: &Invocation) -> SweepResult<JobHandle> {
        let session = ScreenCensus::session_name(&self.session_prefix, &invocation.run_name);
        let shell_command = self.shell_command(invocation)?;
        log::debug!("Starting screen session '{session}': {shell_command}");

        let status = Command::new("screen")
            .arg("-dmS")
            .arg(&session)
            .arg("sh")
            .arg("-c")
            .arg(&shell_command)
            .stdin(Stdio::null())
            .status()
            .context("Failed to run 'screen'")?;
        if !status.success() {
            bail!("'screen' exited with {status} while starting session '{session}'");
        }

        Ok(JobHandle::new(
            id,
            &invocation.run_name,
            JobTarget::Session(session),
        ))
    }
}

/// Launches each run as a child process.
///
/// Standard output and error go to the run's console log. A detached thread reaps each child once
/// it exits, so finished runs leave the process table.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    simulator: SimulatorCommand,
}

impl ProcessLauncher {
    pub fn new(simulator: SimulatorCommand) -> Self {
        Self { simulator }
    }
}

impl JobLauncher for ProcessLauncher {
    fn launch(&self, id: JobId, invocation: &Invocation) -> SweepResult<JobHandle> {
        let stdout = File::create(&invocation.console_log).with_context(|| {
            format!(
                "Failed to create console log '{}'",
                invocation.console_log.display()
            )
        })?;
        let stderr = stdout
            .try_clone()
            .context("Failed to share the console log with stderr")?;

        let mut command = Command::new(&self.simulator.program);
        command
            .arg(invocation.run_dir_arg())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        if let Some(dir) = &self.simulator.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().with_context(|| {
            format!(
                "Failed to start '{}'",
                self.simulator.program.display()
            )
        })?;
        let pid = child.id();
        log::debug!("Started {} with PID {pid}", invocation.run_name);

        let run_name = invocation.run_name.clone();
        let reaper = std::thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => log::debug!("{run_name} (PID {pid}) exited with {status}"),
                Err(e) => log::warn!("Failed to wait for {run_name} (PID {pid}): {e}"),
            });
        if let Err(e) = reaper {
            log::warn!("Could not start a reaper for PID {pid}, it will linger once exited: {e}");
        }

        Ok(JobHandle::new(
            id,
            &invocation.run_name,
            JobTarget::Pid(pid),
        ))
    }
}
