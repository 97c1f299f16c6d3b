use std::env;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;

use crate::types::SweepResult;

/// Environment variable to override the path to the simulator binary that every run executes.
pub const SWEEP_SIMULATOR_PATH_ENV: &str = "SWEEP_SIMULATOR_PATH";

/// Environment variable to override the path to the analysis tool run on every run's output.
pub const SWEEP_ANALYSIS_PATH_ENV: &str = "SWEEP_ANALYSIS_PATH";

pub const DEFAULT_SIMULATOR: &str = "main_satnet";

pub const DEFAULT_ANALYSIS: &str = "plot_ping";

/// Get the path to the simulator binary.
///
/// See [tool_path] for how [`SWEEP_SIMULATOR_PATH_ENV`] is interpreted.
pub fn simulator_path() -> SweepResult<PathBuf> {
    tool_path(SWEEP_SIMULATOR_PATH_ENV, DEFAULT_SIMULATOR)
}

/// Get the path to the analysis tool.
///
/// See [tool_path] for how [`SWEEP_ANALYSIS_PATH_ENV`] is interpreted.
pub fn analysis_path() -> SweepResult<PathBuf> {
    tool_path(SWEEP_ANALYSIS_PATH_ENV, DEFAULT_ANALYSIS)
}

/// Get the path to an external tool.
///
/// If the `env_var` environment variable is set to a path, that path is used and must exist. If it
/// is not set, or is set to the bare `default_name`, the tool is looked up in the system's PATH.
pub fn tool_path(env_var: &str, default_name: &str) -> SweepResult<PathBuf> {
    match env::var(env_var).ok().as_deref() {
        Some("") => {
            bail!("'{env_var}' set to empty string");
        }
        Some(name) if name == default_name => find_in_path(env_var, default_name),
        None => find_in_path(env_var, default_name),
        Some(path) => {
            let tool_path = PathBuf::from(path);
            if !tool_path.exists() {
                bail!(
                    "Path to '{default_name}' overwritten with '{env_var}={path}' but that path doesn't exist",
                    path = tool_path.display()
                );
            }
            Ok(tool_path)
        }
    }
}

fn find_in_path(env_var: &str, name: &str) -> SweepResult<PathBuf> {
    log::warn!("'{env_var}' is not a path so looking for '{name}' in user's 'PATH'");
    which::which(name).with_context(|| {
        format!("'{name}' not found in PATH. Please install it or set '{env_var}' to the correct path.")
    })
}
