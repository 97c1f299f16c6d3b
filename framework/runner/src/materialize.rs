use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use sweep_core::prelude::RunDescriptor;

use crate::template::{substitute, unresolved_tokens, Substitution, TemplateError};
use crate::types::SweepResult;

/// Name of the materialized config inside each run directory.
pub const CONFIG_FILE_NAME: &str = "config_ns3.properties";

/// Name of the directory inside each run directory that the simulator writes its logs to.
pub const LOGS_DIR_NAME: &str = "logs_ns3";

/// Name of the file inside the logs directory that receives the simulator's console output.
pub const CONSOLE_LOG_NAME: &str = "console.txt";

pub const TOKEN_SATELLITE_NETWORK: &str = "[SATELLITE-NETWORK]";
pub const TOKEN_DYNAMIC_STATE: &str = "[DYNAMIC-STATE]";
pub const TOKEN_DYNAMIC_STATE_UPDATE_INTERVAL_NS: &str = "[DYNAMIC-STATE-UPDATE-INTERVAL-NS]";
pub const TOKEN_SIMULATION_END_TIME_NS: &str = "[SIMULATION-END-TIME-NS]";
pub const TOKEN_ISL_DATA_RATE: &str = "[ISL-DATA-RATE-MEGABIT-PER-S]";
pub const TOKEN_GSL_DATA_RATE: &str = "[GSL-DATA-RATE-MEGABIT-PER-S]";
pub const TOKEN_ISL_MAX_QUEUE_SIZE: &str = "[ISL-MAX-QUEUE-SIZE-PKTS]";
pub const TOKEN_GSL_MAX_QUEUE_SIZE: &str = "[GSL-MAX-QUEUE-SIZE-PKTS]";
pub const TOKEN_ENABLE_ISL_UTILIZATION_TRACKING: &str = "[ENABLE-ISL-UTILIZATION-TRACKING]";
pub const TOKEN_ISL_UTILIZATION_TRACKING_INTERVAL: &str =
    "[ISL-UTILIZATION-TRACKING-INTERVAL-NS-COMPLETE]";
pub const TOKEN_PINGMESH_INTERVAL_NS: &str = "[PINGMESH-INTERVAL-NS]";
pub const TOKEN_FROM: &str = "[FROM]";
pub const TOKEN_TO: &str = "[TO]";

/// Where the files of a sweep live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub runs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub pdf_dir: PathBuf,
}

impl RunLayout {
    pub fn new(
        runs_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        pdf_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runs_dir: runs_dir.into(),
            data_dir: data_dir.into(),
            pdf_dir: pdf_dir.into(),
        }
    }

    pub fn run_dir(&self, name: &str) -> PathBuf {
        self.runs_dir.join(name)
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.run_dir(name).join(CONFIG_FILE_NAME)
    }

    pub fn logs_dir(&self, name: &str) -> PathBuf {
        self.run_dir(name).join(LOGS_DIR_NAME)
    }

    pub fn console_log_path(&self, name: &str) -> PathBuf {
        self.logs_dir(name).join(CONSOLE_LOG_NAME)
    }

    pub fn data_out_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    pub fn pdf_out_dir(&self, name: &str) -> PathBuf {
        self.pdf_dir.join(name)
    }

    /// Remove everything a previous sweep left in the output directories and recreate them empty.
    pub fn reset(&self) -> SweepResult<()> {
        for dir in [&self.runs_dir, &self.data_dir, &self.pdf_dir] {
            remove_dir_if_present(dir)?;
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
        }
        Ok(())
    }

    /// Create the output directories if they do not exist, keeping any content.
    pub fn ensure(&self) -> SweepResult<()> {
        for dir in [&self.runs_dir, &self.data_dir, &self.pdf_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;
        }
        Ok(())
    }
}

/// The template substitutions for one run.
///
/// The utilization tracking interval token expands to a whole `key=value` line when tracking is
/// enabled and to nothing when it is disabled.
pub fn substitutions(descriptor: &RunDescriptor) -> Vec<Substitution> {
    let data_rate = format_float(descriptor.data_rate_megabit_per_s);
    let queue_size = descriptor.queue_size_pkt.to_string();
    let tracking_interval = if descriptor.enable_isl_utilization_tracking {
        format!(
            "isl_utilization_tracking_interval_ns={}",
            descriptor.isl_utilization_tracking_interval_ns
        )
    } else {
        String::new()
    };

    vec![
        Substitution::new(TOKEN_SATELLITE_NETWORK, &descriptor.satellite_network),
        Substitution::new(TOKEN_DYNAMIC_STATE, &descriptor.dynamic_state),
        Substitution::new(
            TOKEN_DYNAMIC_STATE_UPDATE_INTERVAL_NS,
            descriptor.dynamic_state_update_interval_ns.to_string(),
        ),
        Substitution::new(
            TOKEN_SIMULATION_END_TIME_NS,
            descriptor.simulation_end_time_ns.to_string(),
        ),
        Substitution::new(TOKEN_ISL_DATA_RATE, &data_rate),
        Substitution::new(TOKEN_GSL_DATA_RATE, &data_rate),
        Substitution::new(TOKEN_ISL_MAX_QUEUE_SIZE, &queue_size),
        Substitution::new(TOKEN_GSL_MAX_QUEUE_SIZE, &queue_size),
        Substitution::new(
            TOKEN_ENABLE_ISL_UTILIZATION_TRACKING,
            descriptor.enable_isl_utilization_tracking.to_string(),
        ),
        Substitution::new(TOKEN_ISL_UTILIZATION_TRACKING_INTERVAL, tracking_interval),
        Substitution::new(
            TOKEN_PINGMESH_INTERVAL_NS,
            descriptor.pingmesh_interval_ns.to_string(),
        ),
        Substitution::new(TOKEN_FROM, descriptor.from_id.to_string()),
        Substitution::new(TOKEN_TO, descriptor.to_id.to_string()),
    ]
}

/// Floats always keep a decimal point, `10000.0` rather than `10000`.
///
/// Very large or small values use scientific notation with a signed exponent of at least two
/// digits, `1e+16` and `1.5e-05`.
fn format_float(value: f64) -> String {
    let repr = format!("{value:?}");
    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return repr;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Creates the run directory of a descriptor and writes its config from the template.
#[derive(Debug, Clone)]
pub struct ConfigMaterializer {
    layout: RunLayout,
    template_path: PathBuf,
    strict: bool,
}

impl ConfigMaterializer {
    pub fn new(layout: RunLayout, template_path: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            template_path: template_path.into(),
            strict: false,
        }
    }

    /// Reject configs that still contain placeholders after substitution.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Recreate the run directory of `descriptor` and write its config.
    ///
    /// Any existing directory of the same name is removed first. On return the directory holds
    /// the config file and an empty logs directory. Returns the path of the config file.
    pub fn materialize(&self, descriptor: &RunDescriptor) -> SweepResult<PathBuf> {
        let run_dir = self.layout.run_dir(&descriptor.name);
        remove_dir_if_present(&run_dir)?;

        let logs_dir = self.layout.logs_dir(&descriptor.name);
        log::trace!("Creating run directory '{}'", run_dir.display());
        fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create directory '{}'", logs_dir.display()))?;

        let template = fs::read_to_string(&self.template_path).map_err(|source| {
            TemplateError::Read {
                path: self.template_path.clone(),
                source,
            }
        })?;

        let config_path = self.layout.config_path(&descriptor.name);
        let config = substitute(&template, &substitutions(descriptor));
        if self.strict {
            let tokens = unresolved_tokens(&config);
            if !tokens.is_empty() {
                return Err(TemplateError::Unresolved {
                    path: config_path,
                    tokens,
                }
                .into());
            }
        }

        fs::write(&config_path, config)
            .with_context(|| format!("Failed to write config '{}'", config_path.display()))?;
        log::trace!("Wrote config '{}'", config_path.display());

        Ok(config_path)
    }
}

fn remove_dir_if_present(dir: &Path) -> SweepResult<()> {
    if dir.exists() {
        log::trace!("Removing '{}'", dir.display());
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to remove directory '{}'", dir.display()))?;
    }
    Ok(())
}
