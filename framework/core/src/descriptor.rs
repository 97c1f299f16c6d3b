use serde::{Deserialize, Serialize};

/// One entry of the configured run list before deduplication.
///
/// The transport protocol is only consumed by the simulator, so two entries that differ only in
/// their protocol describe the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRun {
    /// The topology family, used as the prefix of the run name, e.g. `kuiper_1156_isls`.
    pub topology_family: String,
    pub from_id: u32,
    pub to_id: u32,
    pub protocol: String,
    /// The name of the generated satellite network the simulator should load.
    pub satellite_network: String,
}

/// The fields of a [RawRun] that decide whether two entries describe the same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey<'a> {
    pub topology_family: &'a str,
    pub from_id: u32,
    pub to_id: u32,
    pub satellite_network: &'a str,
}

impl RawRun {
    pub fn new(
        topology_family: impl Into<String>,
        from_id: u32,
        to_id: u32,
        protocol: impl Into<String>,
        satellite_network: impl Into<String>,
    ) -> Self {
        Self {
            topology_family: topology_family.into(),
            from_id,
            to_id,
            protocol: protocol.into(),
            satellite_network: satellite_network.into(),
        }
    }

    /// The dedup key of this entry. The protocol is not part of it.
    pub fn dedup_key(&self) -> DedupKey<'_> {
        DedupKey {
            topology_family: &self.topology_family,
            from_id: self.from_id,
            to_id: self.to_id,
            satellite_network: &self.satellite_network,
        }
    }
}

/// Values shared by every run of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConstants {
    pub dynamic_state_update_interval_ms: u64,
    pub simulation_end_time_s: u64,
    pub pingmesh_interval_ns: u64,
    pub enable_isl_utilization_tracking: bool,
    pub isl_utilization_tracking_interval_ns: u64,
    /// Applied to both inter-satellite and ground-to-satellite links.
    pub data_rate_megabit_per_s: f64,
    /// Applied to both inter-satellite and ground-to-satellite links.
    pub queue_size_pkt: u64,
}

impl Default for SweepConstants {
    fn default() -> Self {
        Self {
            dynamic_state_update_interval_ms: 1000,
            simulation_end_time_s: 200,
            pingmesh_interval_ns: 1_000_000_000,
            enable_isl_utilization_tracking: true,
            isl_utilization_tracking_interval_ns: 1_000_000_000,
            data_rate_megabit_per_s: 10_000.0,
            queue_size_pkt: 100_000,
        }
    }
}

impl SweepConstants {
    pub fn dynamic_state_update_interval_ns(&self) -> u64 {
        self.dynamic_state_update_interval_ms * 1_000_000
    }

    pub fn simulation_end_time_ns(&self) -> u64 {
        self.simulation_end_time_s * 1_000_000_000
    }

    /// The label of the generated dynamic state the simulator reads, e.g.
    /// `dynamic_state_1000ms_for_200s`.
    pub fn dynamic_state(&self) -> String {
        format!(
            "dynamic_state_{}ms_for_{}s",
            self.dynamic_state_update_interval_ms, self.simulation_end_time_s
        )
    }
}

/// One fully parameterized run of the simulator.
///
/// The name is derived from the topology family and the endpoint pair, so it is unique for every
/// distinct [DedupKey] within a satellite network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescriptor {
    pub name: String,
    pub topology_name: String,
    pub satellite_network: String,
    pub dynamic_state: String,
    pub dynamic_state_update_interval_ns: u64,
    pub simulation_end_time_ns: u64,
    pub data_rate_megabit_per_s: f64,
    pub queue_size_pkt: u64,
    pub enable_isl_utilization_tracking: bool,
    pub isl_utilization_tracking_interval_ns: u64,
    pub from_id: u32,
    pub to_id: u32,
    pub pingmesh_interval_ns: u64,
}

impl RunDescriptor {
    pub fn from_raw(raw: &RawRun, constants: &SweepConstants) -> Self {
        Self {
            name: Self::run_name(&raw.topology_family, raw.from_id, raw.to_id),
            topology_name: raw.topology_family.clone(),
            satellite_network: raw.satellite_network.clone(),
            dynamic_state: constants.dynamic_state(),
            dynamic_state_update_interval_ns: constants.dynamic_state_update_interval_ns(),
            simulation_end_time_ns: constants.simulation_end_time_ns(),
            data_rate_megabit_per_s: constants.data_rate_megabit_per_s,
            queue_size_pkt: constants.queue_size_pkt,
            enable_isl_utilization_tracking: constants.enable_isl_utilization_tracking,
            isl_utilization_tracking_interval_ns: constants.isl_utilization_tracking_interval_ns,
            from_id: raw.from_id,
            to_id: raw.to_id,
            pingmesh_interval_ns: constants.pingmesh_interval_ns,
        }
    }

    pub fn run_name(topology_family: &str, from_id: u32, to_id: u32) -> String {
        format!("{topology_family}_{from_id}_to_{to_id}_pings")
    }
}

impl std::fmt::Display for RunDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} -> {} on {})",
            self.name, self.from_id, self.to_id, self.satellite_network
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn dedup_key_ignores_protocol() {
        let a = RawRun::new("kuiper_1156_isls", 1157, 1165, "TcpNewReno", "net");
        let b = RawRun::new("kuiper_1156_isls", 1157, 1165, "TcpVegas", "net");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_includes_network_variant() {
        let a = RawRun::new("kuiper_1156_isls", 1157, 1165, "TcpNewReno", "net_a");
        let b = RawRun::new("kuiper_1156_isls", 1157, 1165, "TcpNewReno", "net_b");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn descriptor_takes_constants() {
        let raw = RawRun::new("kuiper_1156_isls", 1177, 1180, "TcpNewReno", "net");
        let descriptor = RunDescriptor::from_raw(&raw, &SweepConstants::default());

        assert_eq!(descriptor.name, "kuiper_1156_isls_1177_to_1180_pings");
        assert_eq!(descriptor.dynamic_state, "dynamic_state_1000ms_for_200s");
        assert_eq!(descriptor.dynamic_state_update_interval_ns, 1_000_000_000);
        assert_eq!(descriptor.simulation_end_time_ns, 200_000_000_000);
        assert_eq!(descriptor.queue_size_pkt, 100_000);
        assert!(descriptor.enable_isl_utilization_tracking);
    }
}
