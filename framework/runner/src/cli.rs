use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// How runs are launched and how active runs are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Each run is a detached `screen` session, counted with `screen -ls`.
    Screen,
    /// Each run is a detached child process, counted from the process table.
    Process,
}

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct SweepCli {
    /// The config template that is materialized into every run directory
    #[clap(long)]
    pub template: PathBuf,

    /// The directory that holds one sub-directory per run
    #[clap(long, default_value = "runs")]
    pub runs_dir: PathBuf,

    /// The directory that holds the derived data of each run
    #[clap(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// The directory that holds the rendered plots of each run
    #[clap(long, default_value = "pdf")]
    pub pdf_dir: PathBuf,

    /// The maximum number of simulator runs that may be active at the same time.
    ///
    /// Overrides the default chosen by the sweep. Must be at least 1.
    #[clap(long)]
    pub max_processes: Option<usize>,

    /// How often to check for finished runs, in milliseconds
    #[clap(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// How runs are launched and counted
    #[clap(long, value_enum, default_value_t = Backend::Screen)]
    pub backend: Backend,

    /// Prefix for the names of launched sessions. Defaults to the sweep name.
    ///
    /// Only sessions with this prefix are counted as belonging to this sweep.
    #[clap(long)]
    pub session_prefix: Option<String>,

    /// Working directory for the simulator
    #[clap(long)]
    pub simulator_dir: Option<PathBuf>,

    /// Arguments passed to the analysis tool before the per-run arguments, for example the path
    /// of a plotting script. Can be given multiple times.
    #[clap(long = "analysis-arg")]
    pub analysis_args: Vec<String>,

    /// Working directory for the analysis tool
    #[clap(long)]
    pub analysis_dir: Option<PathBuf>,

    /// Fail if a materialized config still contains `[PLACEHOLDER]` tokens
    #[clap(long, default_value = "false")]
    pub strict_templates: bool,

    /// Do not wipe the runs, data and pdf directories before starting
    #[clap(long, default_value = "false")]
    pub keep_outputs: bool,

    /// File that a summary of the sweep is appended to, as one JSON object per line
    #[clap(long, default_value = "sweep_summary.jsonl")]
    pub summary_file: PathBuf,

    /// Use this id for the sweep instead of a generated one
    #[clap(long)]
    pub run_id: Option<String>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}
