// Rate derivation: cumulative counters of two snapshots -> per-second rates.
// Devices are matched by name; a counter that went backwards is treated as a reset.

use std::collections::HashMap;
use std::time::Duration;

use crate::models::{DiskIoRate, InterfaceRate, RateSample, Snapshot};

/// Compute rates of `current` against `previous` over the measured `elapsed` wall time.
///
/// - No `previous` (cold start) or zero `elapsed`: every rate is 0.
/// - A device missing from `previous` is new: rate 0 this tick.
/// - A device missing from `current` is dropped.
/// - A decreased counter contributes a zero delta, never a negative rate.
pub fn derive(previous: Option<&Snapshot>, current: &Snapshot, elapsed: Duration) -> RateSample {
    let Some(previous) = previous else {
        return RateSample::zero(current);
    };
    if elapsed.is_zero() {
        return RateSample::zero(current);
    }
    let secs = elapsed.as_secs_f64();
    let window_ms = secs * 1000.0;

    let prev_net: HashMap<&str, (u64, u64)> = previous
        .network
        .iter()
        .map(|i| (i.name.as_str(), (i.rx_bytes, i.tx_bytes)))
        .collect();
    let network = current
        .network
        .iter()
        .map(|iface| match prev_net.get(iface.name.as_str()) {
            Some(&(rx, tx)) => InterfaceRate {
                name: iface.name.clone(),
                rx_bytes_per_sec: per_second(iface.rx_bytes, rx, secs),
                tx_bytes_per_sec: per_second(iface.tx_bytes, tx, secs),
            },
            None => InterfaceRate {
                name: iface.name.clone(),
                ..Default::default()
            },
        })
        .collect();

    let prev_io: HashMap<&str, (u64, u64, u64)> = previous
        .disk_io
        .iter()
        .map(|d| (d.name.as_str(), (d.read_bytes, d.write_bytes, d.io_ms)))
        .collect();
    let disk_io = current
        .disk_io
        .iter()
        .map(|disk| match prev_io.get(disk.name.as_str()) {
            Some(&(read, write, io_ms)) => DiskIoRate {
                name: disk.name.clone(),
                read_bytes_per_sec: per_second(disk.read_bytes, read, secs),
                write_bytes_per_sec: per_second(disk.write_bytes, write, secs),
                utilization_percent: utilization(disk.io_ms, io_ms, window_ms),
            },
            None => DiskIoRate {
                name: disk.name.clone(),
                ..Default::default()
            },
        })
        .collect();

    RateSample {
        elapsed_secs: secs,
        network,
        disk_io,
    }
}

fn per_second(current: u64, previous: u64, secs: f64) -> f64 {
    current.saturating_sub(previous) as f64 / secs
}

/// Busy-ms delta over the window, as a percentage clamped to [0, 100].
/// Approximate: the kernel's io_ms accounting is not aligned with our tick.
pub fn utilization(current_io_ms: u64, previous_io_ms: u64, window_ms: f64) -> f64 {
    if window_ms <= 0.0 {
        return 0.0;
    }
    let busy = current_io_ms.saturating_sub(previous_io_ms) as f64;
    (busy / window_ms * 100.0).clamp(0.0, 100.0)
}
