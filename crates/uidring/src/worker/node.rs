use chrono::{DateTime, Utc};
use rand::Rng;

use crate::worker::environment::HostEnvironment;

/// How the issuing process is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorkerNodeType {
    Container,
    Actual,
}

/// The entity a durable worker-id registry persists, one row per process
/// start.
///
/// Containers are identified by their injected host and port. Bare hosts use
/// their primary address plus a launch-millis/pseudorandom token in place of
/// a port, so repeated launches on the same host stay distinct rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerNode {
    pub host_name: String,
    pub port: String,
    pub node_type: WorkerNodeType,
    pub launch_date: DateTime<Utc>,
}

impl WorkerNode {
    /// Builds the node identity from a resolved environment.
    pub fn build(environment: &HostEnvironment) -> Self {
        let launch_date = Utc::now();
        match environment {
            HostEnvironment::Container { host, port } => Self {
                host_name: host.clone(),
                port: port.clone(),
                node_type: WorkerNodeType::Container,
                launch_date,
            },
            HostEnvironment::Actual { local_address } => {
                let token = rand::thread_rng().gen_range(0..100_000);
                Self {
                    host_name: local_address.clone(),
                    port: format!("{}-{}", launch_date.timestamp_millis(), token),
                    node_type: WorkerNodeType::Actual,
                    launch_date,
                }
            }
        }
    }
}
