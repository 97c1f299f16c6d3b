use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Post-processing outcome of a single run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunOutcomeSummary {
    /// The unique name of the run
    pub name: String,
    /// Source endpoint id of the probed pair
    pub from_id: u32,
    /// Destination endpoint id of the probed pair
    pub to_id: u32,
    /// Set if post-processing this run failed
    ///
    /// The message is the rendered error chain. A failure here never affected any other run.
    pub error: Option<String>,
}

impl RunOutcomeSummary {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepSummary {
    /// The unique sweep id
    ///
    /// Chosen by the runner. Unique for each invocation.
    pub run_id: String,
    /// The name of the sweep that was run
    pub sweep_name: String,
    /// The time the sweep started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The concurrency limit the sweep was run with
    pub max_processes: usize,
    /// One entry per run, in launch order
    pub runs: Vec<RunOutcomeSummary>,
    /// Environment variables set for the sweep
    ///
    /// This won't capture all environment variables. Just the ones that the runner is aware of.
    pub env: HashMap<String, String>,
    /// The version of the sweep runner that was used
    pub runner_version: String,
}

impl SweepSummary {
    /// Create a new sweep summary with no runs recorded yet
    pub fn new(
        run_id: String,
        sweep_name: String,
        started_at: i64,
        max_processes: usize,
        runner_version: String,
    ) -> Self {
        Self {
            run_id,
            sweep_name,
            started_at,
            max_processes,
            runs: Vec::new(),
            env: HashMap::with_capacity(0),
            runner_version,
        }
    }

    /// Record the outcome of one run
    pub fn push_run(&mut self, run: RunOutcomeSummary) {
        self.runs.push(run);
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// The number of runs whose post-processing failed
    pub fn failed_count(&self) -> usize {
        self.runs.iter().filter(|r| !r.succeeded()).count()
    }

    /// Compute a fingerprint for this sweep summary
    ///
    /// The fingerprint is intended to identify the configuration of the sweep, not its outcome.
    /// It uses the
    ///     - Sweep name
    ///     - Concurrency limit
    ///     - Run names and endpoint pairs, in launch order
    ///     - Selected environment variables
    ///     - Runner version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.sweep_name.as_bytes());
        Digest::update(&mut hasher, (self.max_processes as u64).to_le_bytes());
        for run in &self.runs {
            Digest::update(&mut hasher, run.name.as_bytes());
            Digest::update(&mut hasher, run.from_id.to_le_bytes());
            Digest::update(&mut hasher, run.to_id.to_le_bytes());
        }
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.runner_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the sweep summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_sweep_summary(summary: &SweepSummary, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_sweep_summary(summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the sweep summary to a writer
pub fn store_sweep_summary<W: Write>(summary: &SweepSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, summary)?;
    Ok(())
}

/// Load a sweep summary from a reader
pub fn load_sweep_summary<R: Read>(reader: R) -> anyhow::Result<SweepSummary> {
    let reader = std::io::BufReader::new(reader);
    let summary: SweepSummary = serde_json::from_reader(reader)?;
    Ok(summary)
}

/// Load sweep summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_sweep_summary].
pub fn load_sweep_summaries(path: impl AsRef<Path>) -> anyhow::Result<Vec<SweepSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut summaries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summaries.push(serde_json::from_str(&line)?);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_summary() -> SweepSummary {
        let mut summary = SweepSummary::new(
            "abc123".to_string(),
            "kuiper_pings".to_string(),
            1_700_000_000,
            2,
            "0.2.0".to_string(),
        );
        summary.push_run(RunOutcomeSummary {
            name: "kuiper_1156_isls_1157_to_1165_pings".to_string(),
            from_id: 1157,
            to_id: 1165,
            error: None,
        });
        summary.push_run(RunOutcomeSummary {
            name: "kuiper_1156_isls_1177_to_1180_pings".to_string(),
            from_id: 1177,
            to_id: 1180,
            error: Some("exit status: 1".to_string()),
        });
        summary
    }

    #[test]
    fn appended_summaries_are_loaded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep_summary.jsonl");

        let first = sample_summary();
        let mut second = sample_summary();
        second.run_id = "def456".to_string();

        append_sweep_summary(&first, &path).unwrap();
        append_sweep_summary(&second, &path).unwrap();

        let loaded = load_sweep_summaries(&path).unwrap();
        assert_eq!(vec![first, second], loaded);
    }

    #[test]
    fn stored_summary_loads_back() {
        let summary = sample_summary();
        let mut buffer = Vec::new();
        store_sweep_summary(&summary, &mut buffer).unwrap();

        let loaded = load_sweep_summary(buffer.as_slice()).unwrap();
        assert_eq!(summary, loaded);
    }

    #[test]
    fn load_rejects_truncated_summary() {
        let mut buffer = Vec::new();
        store_sweep_summary(&sample_summary(), &mut buffer).unwrap();
        buffer.truncate(buffer.len() / 2);

        assert!(load_sweep_summary(buffer.as_slice()).is_err());
    }

    #[test]
    fn fingerprint_ignores_outcome_and_run_id() {
        let a = sample_summary();
        let mut b = sample_summary();
        b.run_id = "other".to_string();
        b.started_at += 100;
        b.runs[1].error = None;

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_concurrency_limit() {
        let a = sample_summary();
        let mut b = sample_summary();
        b.max_processes = 4;

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_does_not_depend_on_env_insertion_order() {
        let mut a = sample_summary();
        a.add_env("A".to_string(), "1".to_string());
        a.add_env("B".to_string(), "2".to_string());

        let mut b = sample_summary();
        b.add_env("B".to_string(), "2".to_string());
        b.add_env("A".to_string(), "1".to_string());

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn counts_failed_runs() {
        assert_eq!(1, sample_summary().failed_count());
    }
}
