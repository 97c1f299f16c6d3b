use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use parking_lot::Mutex;
use sweep_core::prelude::{JobHandle, JobTarget};
use sysinfo::{
    Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind,
};

/// What `screen -ls` prints when the user has no sessions at all.
const NO_SOCKETS: &str = "No Sockets found";

#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error("Failed to run '{command}': {source}")]
    Probe {
        command: String,
        source: std::io::Error,
    },
    #[error("'{command}' failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("This census cannot track {0}")]
    UnsupportedTarget(JobTarget),
}

/// Counts the jobs that are active in the namespace shared by all sweeps on this host.
///
/// Launched jobs are detached, so this is the only way the orchestrator learns that they have
/// finished. Implementations are polled and never notify.
pub trait ProcessCensus: Send + Sync {
    /// A human readable name for the namespace being counted.
    fn namespace(&self) -> &str;

    /// The number of jobs currently active in the namespace.
    fn active_count(&self) -> Result<usize, CensusError>;

    /// Whether the given job is still active.
    fn is_active(&self, job: &JobHandle) -> Result<bool, CensusError>;
}

/// Counts detached `screen` sessions whose name starts with `<prefix>-`.
#[derive(Debug, Clone)]
pub struct ScreenCensus {
    prefix: String,
    program: PathBuf,
}

impl ScreenCensus {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            program: PathBuf::from("screen"),
        }
    }

    /// Use another `screen` executable than the one found in `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// The name of the session that runs `run_name`.
    pub fn session_name(prefix: &str, run_name: &str) -> String {
        format!("{prefix}-{run_name}")
    }

    fn sessions(&self) -> Result<Vec<String>, CensusError> {
        let command = format!("{} -ls", self.program.display());
        let output = Command::new(&self.program)
            .arg("-ls")
            .output()
            .map_err(|source| CensusError::Probe {
                command: command.clone(),
                source,
            })?;

        let own_prefix = format!("{}-", self.prefix);
        let sessions = screen_listing(&command, &output)?
            .into_iter()
            .filter(|name| name.starts_with(&own_prefix))
            .collect::<Vec<_>>();
        log::trace!("Found {} screen session(s) for '{}'", sessions.len(), self.prefix);

        Ok(sessions)
    }
}

/// All session names in the output of `screen -ls`.
///
/// `screen -ls` exits non-zero when there are no sessions and, on some versions, when there are.
/// A failed run is only accepted if it says there are no sockets or still lists sessions.
fn screen_listing(command: &str, output: &Output) -> Result<Vec<String>, CensusError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let sessions = parse_screen_sessions(&stdout);
    if output.status.success() || !sessions.is_empty() {
        return Ok(sessions);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.contains(NO_SOCKETS) || stderr.contains(NO_SOCKETS) {
        return Ok(Vec::new());
    }

    Err(CensusError::Failed {
        command: command.to_string(),
        status: output.status,
        stderr: stderr.trim().to_string(),
    })
}

impl ProcessCensus for ScreenCensus {
    fn namespace(&self) -> &str {
        &self.prefix
    }

    fn active_count(&self) -> Result<usize, CensusError> {
        Ok(self.sessions()?.len())
    }

    fn is_active(&self, job: &JobHandle) -> Result<bool, CensusError> {
        match &job.target {
            JobTarget::Session(name) => Ok(self.sessions()?.iter().any(|s| s == name)),
            other => Err(CensusError::UnsupportedTarget(other.clone())),
        }
    }
}

/// Extract the session names from the output of `screen -ls`.
///
/// Session lines look like `\t12345.name\t(Detached)`. The name is everything after the first `.`
/// of the first field.
pub fn parse_screen_sessions(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| line.starts_with('\t') || line.starts_with(' '))
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|field| {
            let (pid, name) = field.split_once('.')?;
            (!pid.is_empty() && pid.chars().all(|c| c.is_ascii_digit())).then(|| name.to_string())
        })
        .collect()
}

/// Counts live simulator processes in the process table.
///
/// A process counts if the file name of its executable, or of the first word of its command line,
/// matches the simulator. The kernel's process name is only a fallback since Linux cuts it to 15
/// bytes. Exited children that have not been reaped yet are not counted.
pub struct ProcessTableCensus {
    program_name: OsString,
    namespace: String,
    system: Mutex<System>,
}

impl ProcessTableCensus {
    pub fn new(program_name: impl Into<OsString>) -> Self {
        let program_name = program_name.into();
        let namespace = format!("processes named {}", program_name.to_string_lossy());
        Self {
            program_name,
            namespace,
            system: Mutex::new(System::new()),
        }
    }

    fn runs_program(&self, process: &Process) -> bool {
        let wanted = self.program_name.as_os_str();
        let file_name = |path: &Path| path.file_name() == Some(wanted);

        process.exe().is_some_and(file_name)
            || process
                .cmd()
                .first()
                .is_some_and(|arg0| file_name(Path::new(arg0)))
            || process.name() == wanted
    }
}

impl ProcessCensus for ProcessTableCensus {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn active_count(&self) -> Result<usize, CensusError> {
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        Ok(system
            .processes()
            .values()
            .filter(|p| p.status() != ProcessStatus::Zombie)
            .filter(|p| self.runs_program(p))
            .count())
    }

    fn is_active(&self, job: &JobHandle) -> Result<bool, CensusError> {
        let pid = match &job.target {
            JobTarget::Pid(pid) => Pid::from_u32(*pid),
            other => return Err(CensusError::UnsupportedTarget(other.clone())),
        };

        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        Ok(system
            .process(pid)
            .is_some_and(|p| p.status() != ProcessStatus::Zombie))
    }
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt as _;

    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use sweep_core::prelude::JobId;

    use super::*;

    const LISTING: &str = "There are screens on:
\t4242.kuiper_pings-kuiper_1156_isls_1157_to_1165_pings\t(10/19/2026 10:00:01 AM)\t(Detached)
\t4250.kuiper_pings-kuiper_1156_isls_1177_to_1180_pings\t(Detached)
\t1001.editor\t(Attached)
3 Sockets in /run/screen/S-user.
";

    #[test]
    fn parses_session_names() {
        assert_eq!(
            vec![
                "kuiper_pings-kuiper_1156_isls_1157_to_1165_pings".to_string(),
                "kuiper_pings-kuiper_1156_isls_1177_to_1180_pings".to_string(),
                "editor".to_string(),
            ],
            parse_screen_sessions(LISTING)
        );
    }

    #[test]
    fn no_sockets_means_no_sessions() {
        let listing = "No Sockets found in /run/screen/S-user.\n\n";
        assert!(parse_screen_sessions(listing).is_empty());
    }

    #[test]
    fn session_name_uses_prefix() {
        assert_eq!(
            "kuiper_pings-run_a",
            ScreenCensus::session_name("kuiper_pings", "run_a")
        );
    }

    #[test]
    fn screen_census_rejects_pid_targets() {
        let census = ScreenCensus::new("kuiper_pings");
        let job = JobHandle::new(JobId(0), "run_a", JobTarget::Pid(1));
        assert!(matches!(
            census.is_active(&job),
            Err(CensusError::UnsupportedTarget(_))
        ));
    }

    #[test]
    fn process_table_census_sees_own_process() {
        let census = ProcessTableCensus::new("sweep-test-nonexistent-program");
        let job = JobHandle::new(JobId(0), "self", JobTarget::Pid(std::process::id()));

        assert!(census.is_active(&job).unwrap());
        assert_eq!(0, census.active_count().unwrap());
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[cfg(unix)]
    fn fake_screen(dir: &tempfile::TempDir, script: &str) -> PathBuf {
        let path = dir.path().join("screen");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        make_executable(&path);
        path
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn failing_screen_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let screen = fake_screen(
            &dir,
            "echo \"Cannot make directory '/run/screen': Permission denied\" >&2; exit 1",
        );
        let census = ScreenCensus::new("kuiper_pings").with_program(screen);

        let err = census.active_count().unwrap_err();
        assert!(matches!(err, CensusError::Failed { .. }), "{err}");
        assert!(err.to_string().contains("Permission denied"), "{err}");

        let job = JobHandle::new(JobId(0), "run_a", JobTarget::Session("kuiper_pings-run_a".into()));
        assert!(census.is_active(&job).is_err());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn no_sockets_exit_status_means_no_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let screen = fake_screen(&dir, "echo 'No Sockets found in /run/screen/S-user.'; exit 1");

        let census = ScreenCensus::new("kuiper_pings").with_program(screen);

        assert_eq!(0, census.active_count().unwrap());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn listing_with_failing_exit_status_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("cat <<'EOF'\n{LISTING}EOF\nexit 1");
        let screen = fake_screen(&dir, &script);

        let census = ScreenCensus::new("kuiper_pings").with_program(screen);

        assert_eq!(2, census.active_count().unwrap());
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn process_table_census_matches_names_longer_than_comm() {
        let dir = tempfile::tempdir().unwrap();
        let program_name = "sweep_long_simulator_name";
        let program = dir.path().join(program_name);
        std::fs::copy(which::which("sleep").unwrap(), &program).unwrap();
        make_executable(&program);

        let census = ProcessTableCensus::new(program_name);
        assert_eq!(0, census.active_count().unwrap());

        let mut child = Command::new(&program).arg("30").spawn().unwrap();
        let mut active = 0;
        for _ in 0..100 {
            active = census.active_count().unwrap();
            if active == 1 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        child.kill().unwrap();
        child.wait().unwrap();

        assert_eq!(1, active);
    }
}
