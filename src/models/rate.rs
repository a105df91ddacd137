// Derived per-second rates between two snapshots

use serde::{Deserialize, Serialize};

use super::Snapshot;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceRate {
    pub name: String,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoRate {
    pub name: String,
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    /// Approximate busy percentage in [0, 100]; not OS-exact.
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSample {
    /// Wall time the rates were computed over; 0 on cold start.
    pub elapsed_secs: f64,
    pub network: Vec<InterfaceRate>,
    pub disk_io: Vec<DiskIoRate>,
}

impl RateSample {
    /// All-zero rates for every device in `current` (cold start, one-shot reports).
    pub fn zero(current: &Snapshot) -> Self {
        Self {
            elapsed_secs: 0.0,
            network: current
                .network
                .iter()
                .map(|i| InterfaceRate {
                    name: i.name.clone(),
                    ..Default::default()
                })
                .collect(),
            disk_io: current
                .disk_io
                .iter()
                .map(|d| DiskIoRate {
                    name: d.name.clone(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceRate> {
        self.network.iter().find(|i| i.name == name)
    }

    pub fn disk(&self, name: &str) -> Option<&DiskIoRate> {
        self.disk_io.iter().find(|d| d.name == name)
    }
}
