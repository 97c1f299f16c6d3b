mod constellation;

use anyhow::Context;
use sweep_runner::prelude::*;

use crate::constellation::Constellation;

const CONSTELLATION: Constellation = Constellation::KUIPER_1156;

/// Ground station pairs to ping between, by index into the ground station list.
const GROUND_STATION_PAIRS: [(u32, u32); 3] = [(1, 9), (21, 24), (0, 84)];

fn raw_runs() -> Vec<RawRun> {
    let family = CONSTELLATION.topology_family();
    let network = CONSTELLATION.isls_network();

    GROUND_STATION_PAIRS
        .iter()
        .map(|&(from, to)| {
            RawRun::new(
                &family,
                CONSTELLATION.ground_station_id(from),
                CONSTELLATION.ground_station_id(to),
                "TcpNewReno",
                &network,
            )
        })
        .collect()
}

fn setup(ctx: &mut SweepContext) -> HookResult {
    log::info!(
        "{}: {} orbits of {} satellites at {} km, {} deg inclination",
        CONSTELLATION.nice_name,
        CONSTELLATION.num_orbits,
        CONSTELLATION.satellites_per_orbit,
        CONSTELLATION.altitude_m / 1000.0,
        CONSTELLATION.inclination_deg,
    );
    log::debug!(
        "Eccentricity {}, argument of perigee {} deg, phase difference between orbits: {}",
        CONSTELLATION.eccentricity,
        CONSTELLATION.arg_of_perigee_deg,
        CONSTELLATION.phase_diff,
    );

    let mean_motion = CONSTELLATION.mean_motion_rev_per_day();
    let max_gsl = CONSTELLATION.max_gsl_length_m();
    let max_isl = CONSTELLATION.max_isl_length_m();
    log::info!(
        "Mean motion {mean_motion:.6} rev/day, max GSL length {max_gsl:.1} m, max ISL length {max_isl:.1} m"
    );

    ctx.add_summary_env("constellation", CONSTELLATION.nice_name);
    ctx.add_summary_env("mean_motion_rev_per_day", mean_motion);
    ctx.add_summary_env("max_gsl_length_m", max_gsl);
    ctx.add_summary_env("max_isl_length_m", max_isl);

    Ok(())
}

fn main() -> SweepResult<()> {
    let builder = SweepDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_constants(SweepConstants {
            dynamic_state_update_interval_ms: 1000,
            simulation_end_time_s: 200,
            pingmesh_interval_ns: 1_000_000_000,
            enable_isl_utilization_tracking: true,
            isl_utilization_tracking_interval_ns: 1_000_000_000,
            data_rate_megabit_per_s: 10_000.0,
            queue_size_pkt: 100_000,
        })
        .with_runs(raw_runs())
        .with_default_max_processes(1)
        .use_setup(setup);

    run(builder).with_context(|| format!("{} ping sweep failed", CONSTELLATION.nice_name))?;

    Ok(())
}
