// Point-in-time system snapshot models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreStat {
    pub name: String,
    pub usage_percent: f64,
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub model: String,
    pub usage_percent: f64,
    pub cores: Vec<CoreStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

impl MemoryStats {
    pub fn usage_percent(&self) -> f64 {
        percent_of(self.used, self.total)
    }

    pub fn swap_percent(&self) -> f64 {
        percent_of(self.swap_used, self.swap_total)
    }
}

fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// One GPU. Every reading is optional: driver support varies per vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuStat {
    /// Stable identifier across ticks (`card0`, `nvidia0`, ...).
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub usage_percent: Option<f64>,
    pub memory_used: Option<u64>,
    pub memory_total: Option<u64>,
    pub temperature: Option<f64>,
    pub fan_speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureSensor {
    pub label: String,
    /// hwmon driver name (e.g. `coretemp`, `nvme`).
    pub sensor: String,
    pub device_id: String,
    pub device_name: String,
    pub celsius: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanSensor {
    pub label: String,
    pub sensor: String,
    pub device_id: String,
    pub rpm: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskStat {
    pub name: String,
    pub mount_point: String,
    pub total_space: u64,
    pub available_space: u64,
}

/// Cumulative byte counters of one network interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Cumulative counters of one block device from /proc/diskstats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskIoCounters {
    pub name: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub io_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub load_average: LoadAverage,
    pub uptime_secs: u64,
    pub gpus: Vec<GpuStat>,
    pub temperatures: Vec<TemperatureSensor>,
    pub fans: Vec<FanSensor>,
    pub disks: Vec<DiskStat>,
    pub network: Vec<InterfaceCounters>,
    pub disk_io: Vec<DiskIoCounters>,
}
