//! Geometry of a Walker-style shell of satellites, as needed to generate its network state.

use std::f64::consts::PI;

pub const EARTH_RADIUS_M: f64 = 6_378_135.0;
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67408e-11;
pub const EARTH_MASS_KG: f64 = 5.9722e24;

/// Inter-satellite links may not pass below this altitude, to stay clear of the weather.
pub const MIN_ISL_ALTITUDE_M: f64 = 80_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Constellation {
    pub base_name: &'static str,
    pub nice_name: &'static str,
    pub num_orbits: u32,
    pub satellites_per_orbit: u32,
    pub inclination_deg: f64,
    pub altitude_m: f64,
    /// Minimum angle of elevation for a ground station to see a satellite.
    pub min_elevation_deg: f64,
    pub eccentricity: f64,
    pub arg_of_perigee_deg: f64,
    pub phase_diff: bool,
}

impl Constellation {
    pub const KUIPER_1156: Constellation = Constellation {
        base_name: "kuiper_1156",
        nice_name: "Kuiper-1156",
        num_orbits: 34,
        satellites_per_orbit: 34,
        inclination_deg: 59.9,
        altitude_m: 630_000.0,
        min_elevation_deg: 35.0,
        eccentricity: 0.0000001,
        arg_of_perigee_deg: 0.0,
        phase_diff: true,
    };

    pub fn num_satellites(&self) -> u32 {
        self.num_orbits * self.satellites_per_orbit
    }

    /// Node ids of ground stations follow the satellites.
    pub fn ground_station_id(&self, index: u32) -> u32 {
        self.num_satellites() + index
    }

    /// Orbits per day of a satellite in a circular orbit at the shell's altitude.
    pub fn mean_motion_rev_per_day(&self) -> f64 {
        let radius = EARTH_RADIUS_M + self.altitude_m;
        let period_s = (4.0 * PI.powi(2) * radius.powi(3)
            / (GRAVITATIONAL_CONSTANT * EARTH_MASS_KG))
            .sqrt();
        (24.0 * 60.0 * 60.0) / period_s
    }

    /// Radius of the ground area that one satellite covers.
    pub fn satellite_cone_radius_m(&self) -> f64 {
        self.altitude_m / self.min_elevation_deg.to_radians().tan()
    }

    pub fn max_gsl_length_m(&self) -> f64 {
        self.satellite_cone_radius_m().hypot(self.altitude_m)
    }

    pub fn max_isl_length_m(&self) -> f64 {
        let shell = EARTH_RADIUS_M + self.altitude_m;
        let grazing = EARTH_RADIUS_M + MIN_ISL_ALTITUDE_M;
        2.0 * (shell.powi(2) - grazing.powi(2)).sqrt()
    }

    /// The topology family that run names are derived from.
    pub fn topology_family(&self) -> String {
        format!("{}_isls", self.base_name)
    }

    /// The generated satellite network with a plus-grid of ISLs, the 100 most populous cities as
    /// ground stations and routing only over ISLs.
    pub fn isls_network(&self) -> String {
        format!(
            "{}_isls_plus_grid_ground_stations_top_100_algorithm_free_one_only_over_isls",
            self.base_name
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-6 * expected.abs(),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn kuiper_derived_geometry() {
        let kuiper = Constellation::KUIPER_1156;

        assert_close(14.797660561, kuiper.mean_motion_rev_per_day());
        assert_close(899_733.244, kuiper.satellite_cone_radius_m());
        assert_close(1_098_371.481, kuiper.max_gsl_length_m());
        assert_close(5_442_958.203, kuiper.max_isl_length_m());
    }

    #[test]
    fn ground_stations_follow_satellites() {
        let kuiper = Constellation::KUIPER_1156;

        assert_eq!(1156, kuiper.num_satellites());
        assert_eq!(1156, kuiper.ground_station_id(0));
        assert_eq!(1240, kuiper.ground_station_id(84));
    }

    #[test]
    fn network_names() {
        let kuiper = Constellation::KUIPER_1156;

        assert_eq!("kuiper_1156_isls", kuiper.topology_family());
        assert_eq!(
            "kuiper_1156_isls_plus_grid_ground_stations_top_100_algorithm_free_one_only_over_isls",
            kuiper.isls_network()
        );
    }
}
