use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sweep_runner::prelude::{
    run_with, Backend, Collaborators, DirtyEnvironmentError, LaunchError, RawRun, SweepCli,
    SweepDefinitionBuilder,
};
use sweep_runner::testing::{ClusterEvent, FakeAnalysis, FakeCluster};
use sweep_summary_model::load_sweep_summaries;

const TEMPLATE: &str = "\
simulation_end_time_ns=[SIMULATION-END-TIME-NS]
satellite_network_dir=\"gen_data/[SATELLITE-NETWORK]\"
satellite_network_routes_dir=\"gen_data/[SATELLITE-NETWORK]/[DYNAMIC-STATE]\"
dynamic_state_update_interval_ns=[DYNAMIC-STATE-UPDATE-INTERVAL-NS]
isl_data_rate_megabit_per_s=[ISL-DATA-RATE-MEGABIT-PER-S]
gsl_data_rate_megabit_per_s=[GSL-DATA-RATE-MEGABIT-PER-S]
isl_max_queue_size_pkts=[ISL-MAX-QUEUE-SIZE-PKTS]
gsl_max_queue_size_pkts=[GSL-MAX-QUEUE-SIZE-PKTS]
enable_isl_utilization_tracking=[ENABLE-ISL-UTILIZATION-TRACKING]
[ISL-UTILIZATION-TRACKING-INTERVAL-NS-COMPLETE]
pingmesh_interval_ns=[PINGMESH-INTERVAL-NS]
pingmesh_endpoint_pairs=set([FROM]->[TO])
";

fn sample_cli_cfg(root: &Path) -> SweepCli {
    let template = root.join("template_config_ns3.properties");
    std::fs::write(&template, TEMPLATE).unwrap();

    SweepCli {
        template,
        runs_dir: root.join("runs"),
        data_dir: root.join("data"),
        pdf_dir: root.join("pdf"),
        max_processes: Some(2),
        poll_interval_ms: 1,
        backend: Backend::Screen,
        session_prefix: None,
        simulator_dir: None,
        analysis_args: vec![],
        analysis_dir: None,
        strict_templates: true,
        keep_outputs: false,
        summary_file: root.join("sweep_summary.jsonl"),
        run_id: Some("test-run".to_string()),
        no_progress: true,
    }
}

fn raw_runs() -> Vec<RawRun> {
    vec![
        RawRun::new("fam", 1, 9, "TcpNewReno", "net"),
        RawRun::new("fam", 1, 9, "TcpCubic", "net"),
        RawRun::new("fam", 21, 24, "TcpNewReno", "net"),
        RawRun::new("fam", 0, 84, "TcpNewReno", "net"),
    ]
}

fn collaborators(cluster: &FakeCluster, analysis: &FakeAnalysis) -> Collaborators {
    Collaborators {
        census: Arc::new(cluster.census()),
        launcher: Arc::new(cluster.launcher()),
        analysis: Box::new(analysis.clone()),
    }
}

#[test]
fn runs_every_unique_run_and_post_processes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    // The first run finishes last
    let cluster = FakeCluster::new(1).with_duration("fam_1_to_9_pings", 10);
    let analysis = FakeAnalysis::new();

    let sweep = SweepDefinitionBuilder::new("runs_every_unique_run", cli).with_runs(raw_runs());
    let report = run_with(sweep, collaborators(&cluster, &analysis)).unwrap();

    let expected = vec!["fam_1_to_9_pings", "fam_21_to_24_pings", "fam_0_to_84_pings"];
    assert_eq!(expected, cluster.launched());
    assert_eq!(expected, report.run_names());
    assert_eq!(
        expected,
        analysis
            .requests()
            .iter()
            .map(|r| r.run_name.as_str())
            .collect::<Vec<_>>()
    );
    assert_eq!(
        Some(&ClusterEvent::Completed("fam_1_to_9_pings".to_string())),
        cluster.events().last()
    );
    assert!(cluster.max_active() <= 2);

    let config = std::fs::read_to_string(
        dir.path()
            .join("runs/fam_21_to_24_pings/config_ns3.properties"),
    )
    .unwrap();
    assert!(config.contains("pingmesh_endpoint_pairs=set(21->24)"));
    assert!(dir.path().join("runs/fam_0_to_84_pings/logs_ns3").is_dir());
}

#[test]
fn post_processing_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    let cluster = FakeCluster::new(2);
    let analysis = FakeAnalysis::new().with_failing("fam_1_to_9_pings");

    let sweep = SweepDefinitionBuilder::new("post_processing_failure_is_isolated", cli)
        .with_runs(raw_runs());
    let report = run_with(sweep, collaborators(&cluster, &analysis)).unwrap();

    assert_eq!(3, analysis.requests().len());
    assert_eq!(2, report.succeeded_count());
    assert_eq!(
        vec!["fam_1_to_9_pings"],
        report
            .failed()
            .map(|o| o.run_name.as_str())
            .collect::<Vec<_>>()
    );
}

#[test]
fn dirty_environment_aborts_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    let cluster = FakeCluster::new(1).with_foreign_jobs(2);
    let analysis = FakeAnalysis::new();

    let sweep = SweepDefinitionBuilder::new("dirty_environment", cli).with_runs(raw_runs());
    let err = run_with(sweep, collaborators(&cluster, &analysis)).unwrap_err();

    assert_eq!(2, err.downcast_ref::<DirtyEnvironmentError>().unwrap().active);
    assert!(cluster.launched().is_empty());
    assert!(analysis.requests().is_empty());
    assert!(!dir.path().join("runs").exists());
}

#[test]
fn launch_failure_stops_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    let cluster = FakeCluster::new(1).with_failing_launch("fam_21_to_24_pings");
    let analysis = FakeAnalysis::new();

    let sweep = SweepDefinitionBuilder::new("launch_failure", cli).with_runs(raw_runs());
    let err = run_with(sweep, collaborators(&cluster, &analysis)).unwrap_err();

    assert_eq!(
        "fam_21_to_24_pings",
        err.downcast_ref::<LaunchError>().unwrap().run
    );
    assert!(analysis.requests().is_empty());
}

#[test]
fn writes_sweep_summary() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    let summary_file = cli.summary_file.clone();
    let cluster = FakeCluster::new(1);
    let analysis = FakeAnalysis::new().with_failing("fam_0_to_84_pings");

    let sweep = SweepDefinitionBuilder::new("writes_sweep_summary", cli).with_runs(raw_runs());
    run_with(sweep, collaborators(&cluster, &analysis)).unwrap();

    let summaries = load_sweep_summaries(&summary_file).unwrap();
    assert_eq!(1, summaries.len());
    let summary = &summaries[0];
    assert_eq!("test-run", summary.run_id);
    assert_eq!("writes_sweep_summary", summary.sweep_name);
    assert_eq!(2, summary.max_processes);
    assert_eq!(3, summary.runs.len());
    assert_eq!(1, summary.failed_count());
    assert!(summary.runs[2].error.is_some());
}

#[test]
fn stale_outputs_are_wiped() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    let stale = dir.path().join("pdf/old_run/plot.pdf");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();
    let cluster = FakeCluster::new(1);
    let analysis = FakeAnalysis::new();

    let sweep = SweepDefinitionBuilder::new("stale_outputs_are_wiped", cli).with_runs(raw_runs());
    run_with(sweep, collaborators(&cluster, &analysis)).unwrap();

    assert!(!stale.exists());
    assert!(dir.path().join("pdf/fam_1_to_9_pings").is_dir());
}

#[test]
fn keep_outputs_leaves_stale_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let cli = SweepCli {
        keep_outputs: true,
        ..sample_cli_cfg(dir.path())
    };
    let stale = dir.path().join("data/old_run/rtt.csv");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();
    let cluster = FakeCluster::new(1);
    let analysis = FakeAnalysis::new();

    let sweep = SweepDefinitionBuilder::new("keep_outputs", cli).with_runs(raw_runs());
    run_with(sweep, collaborators(&cluster, &analysis)).unwrap();

    assert!(stale.exists());
}

#[test]
fn empty_sweep_completes() {
    let dir = tempfile::tempdir().unwrap();
    let cli = sample_cli_cfg(dir.path());
    let cluster = FakeCluster::new(1);
    let analysis = FakeAnalysis::new();

    let sweep = SweepDefinitionBuilder::new("empty_sweep", cli);
    let report = run_with(sweep, collaborators(&cluster, &analysis)).unwrap();

    assert!(report.outcomes.is_empty());
    assert!(cluster.launched().is_empty());
}
