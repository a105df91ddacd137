// Scalar metric keys for rolling history

use serde::{Serialize, Serializer};
use std::fmt;

use super::{RateSample, Snapshot};

/// Identifies one scalar series. Per-device keys carry the device's stable
/// name, never a list position, so hot-plugged devices keep their own series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKey {
    Cpu,
    Memory,
    Swap,
    GpuUsage(String),
    NetRx(String),
    NetTx(String),
    DiskRead(String),
    DiskWrite(String),
    DiskUtil(String),
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::Cpu => f.write_str("cpu"),
            MetricKey::Memory => f.write_str("memory"),
            MetricKey::Swap => f.write_str("swap"),
            MetricKey::GpuUsage(id) => write!(f, "gpu.{}.usage", id),
            MetricKey::NetRx(name) => write!(f, "net.{}.rx", name),
            MetricKey::NetTx(name) => write!(f, "net.{}.tx", name),
            MetricKey::DiskRead(name) => write!(f, "disk.{}.read", name),
            MetricKey::DiskWrite(name) => write!(f, "disk.{}.write", name),
            MetricKey::DiskUtil(name) => write!(f, "disk.{}.util", name),
        }
    }
}

// Serialized as its display string so it can key a JSON object.
impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Every scalar value one tick contributes to history.
/// GPUs without a usage reading contribute nothing for that tick.
pub fn scalar_metrics(snapshot: &Snapshot, rates: &RateSample) -> Vec<(MetricKey, f64)> {
    let capacity = 3 + snapshot.gpus.len() + rates.network.len() * 2 + rates.disk_io.len() * 3;
    let mut out = Vec::with_capacity(capacity);
    out.push((MetricKey::Cpu, snapshot.cpu.usage_percent));
    out.push((MetricKey::Memory, snapshot.memory.usage_percent()));
    out.push((MetricKey::Swap, snapshot.memory.swap_percent()));
    for gpu in &snapshot.gpus {
        if let Some(usage) = gpu.usage_percent {
            out.push((MetricKey::GpuUsage(gpu.id.clone()), usage));
        }
    }
    for iface in &rates.network {
        out.push((MetricKey::NetRx(iface.name.clone()), iface.rx_bytes_per_sec));
        out.push((MetricKey::NetTx(iface.name.clone()), iface.tx_bytes_per_sec));
    }
    for disk in &rates.disk_io {
        out.push((MetricKey::DiskRead(disk.name.clone()), disk.read_bytes_per_sec));
        out.push((MetricKey::DiskWrite(disk.name.clone()), disk.write_bytes_per_sec));
        out.push((MetricKey::DiskUtil(disk.name.clone()), disk.utilization_percent));
    }
    out
}
