// Linux-specific readers: /proc/cpuinfo, /etc/os-release, /proc/diskstats, hwmon.
// Roots are parameters so tests can point them at fixture trees.
// A missing file means "not available here" and yields None / an empty list.

use std::fs;
use std::path::Path;

use crate::models::{DiskIoCounters, FanSensor, TemperatureSensor};

/// /proc/diskstats counts 512-byte sectors regardless of the device's block size.
pub const SECTOR_SIZE: u64 = 512;

const MAX_TEMP_INPUTS: u32 = 32;
const MAX_FAN_INPUTS: u32 = 8;

/// Read first "model name" from <proc_root>/cpuinfo.
pub fn read_cpu_model(proc_root: &Path) -> Option<String> {
    let content = fs::read_to_string(proc_root.join("cpuinfo")).ok()?;
    for line in content.lines() {
        if line.starts_with("model name") {
            let name = line
                .split_once(':')
                .map(|(_, v)| v.trim())
                .filter(|s| !s.is_empty() && *s != "cpu0")?;
            return Some(name.to_string());
        }
    }
    None
}

/// Fields of os-release the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsRelease {
    pub name: Option<String>,
    pub version: Option<String>,
    pub pretty_name: Option<String>,
}

pub fn read_os_release(path: &Path) -> OsRelease {
    fs::read_to_string(path)
        .map(|content| parse_os_release(&content))
        .unwrap_or_default()
}

pub fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "NAME" => release.name = Some(value.to_string()),
            "VERSION" => release.version = Some(value.to_string()),
            "PRETTY_NAME" => release.pretty_name = Some(value.to_string()),
            _ => {}
        }
    }
    release
}

/// Per-device cumulative I/O counters. Loop, ram and device-mapper entries are
/// skipped, as is anything without a /sys/block entry (partitions).
pub fn read_diskstats(proc_root: &Path, sys_root: &Path) -> Vec<DiskIoCounters> {
    let Ok(content) = fs::read_to_string(proc_root.join("diskstats")) else {
        return Vec::new();
    };
    let block = sys_root.join("block");
    parse_diskstats(&content, |name| block.join(name).exists())
}

pub fn parse_diskstats(content: &str, is_block_device: impl Fn(&str) -> bool) -> Vec<DiskIoCounters> {
    let mut out = Vec::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }
        let name = parts[2];
        if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("dm-") {
            continue;
        }
        if !is_block_device(name) {
            continue;
        }
        let field = |i: usize| parts[i].parse::<u64>().unwrap_or(0);
        out.push(DiskIoCounters {
            name: name.to_string(),
            read_bytes: field(5).saturating_mul(SECTOR_SIZE),
            write_bytes: field(9).saturating_mul(SECTOR_SIZE),
            io_ms: field(12),
        });
    }
    out
}

/// Temperatures and fans of every hwmon chip under `hwmon_dir`.
pub fn read_hwmon(hwmon_dir: &Path, sys_root: &Path) -> (Vec<TemperatureSensor>, Vec<FanSensor>) {
    let mut temps = Vec::new();
    let mut fans = Vec::new();
    let Ok(entries) = fs::read_dir(hwmon_dir) else {
        return (temps, fans);
    };
    let mut chips: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    chips.sort();

    for path in chips {
        let driver = read_trimmed(&path.join("name")).unwrap_or_default();
        let device_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let device_name = resolve_device_name(&path, &driver, sys_root);

        for i in 1..=MAX_TEMP_INPUTS {
            let Some(raw) = read_trimmed(&path.join(format!("temp{}_input", i))) else {
                continue;
            };
            let Some(celsius) = millidegrees_to_celsius(&raw) else {
                continue;
            };
            let label = read_trimmed(&path.join(format!("temp{}_label", i)))
                .unwrap_or_else(|| format!("{} Sensor {}", driver, i));
            temps.push(TemperatureSensor {
                label,
                sensor: driver.clone(),
                device_id: device_id.clone(),
                device_name: device_name.clone(),
                celsius,
            });
        }

        for i in 1..=MAX_FAN_INPUTS {
            let Some(raw) = read_trimmed(&path.join(format!("fan{}_input", i))) else {
                continue;
            };
            let label = read_trimmed(&path.join(format!("fan{}_label", i)))
                .unwrap_or_else(|| format!("{} Fan {}", driver, i));
            fans.push(FanSensor {
                label,
                sensor: driver.clone(),
                device_id: device_id.clone(),
                rpm: raw.parse().unwrap_or(0),
            });
        }
    }
    (temps, fans)
}

/// Millidegrees -> Celsius rounded to 0.1. Readings outside (0, 150) are bogus and dropped.
pub fn millidegrees_to_celsius(raw: &str) -> Option<f64> {
    let celsius = raw.trim().parse::<f64>().ok()? / 1000.0;
    if celsius > 0.0 && celsius < 150.0 {
        Some((celsius * 10.0).round() / 10.0)
    } else {
        None
    }
}

/// Human-readable device behind an hwmon chip. Only NVMe drives resolve (to their model).
fn resolve_device_name(hwmon_path: &Path, driver: &str, sys_root: &Path) -> String {
    if driver != "nvme" {
        return String::new();
    }
    let resolved = fs::canonicalize(hwmon_path)
        .or_else(|_| fs::canonicalize(hwmon_path.join("device")))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(controller) = resolved.split('/').find(|part| is_nvme_controller(part)) else {
        return String::new();
    };
    read_trimmed(&sys_root.join("class/nvme").join(controller).join("model"))
        .unwrap_or_else(|| controller.to_string())
}

fn is_nvme_controller(part: &str) -> bool {
    part.strip_prefix("nvme")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

pub(super) fn read_trimmed(path: &Path) -> Option<String> {
    let v = fs::read_to_string(path).ok()?;
    let v = v.trim();
    if v.is_empty() {
        return None;
    }
    Some(v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_release_prefers_quoted_values() {
        let r = parse_os_release("NAME=\"Debian GNU/Linux\"\nVERSION=\"12 (bookworm)\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\nID=debian\n");
        assert_eq!(r.name.as_deref(), Some("Debian GNU/Linux"));
        assert_eq!(r.version.as_deref(), Some("12 (bookworm)"));
        assert_eq!(r.pretty_name.as_deref(), Some("Debian GNU/Linux 12 (bookworm)"));
    }

    #[test]
    fn os_release_skips_empty_values() {
        let r = parse_os_release("PRETTY_NAME=\"\"\nNAME=Arch\n");
        assert_eq!(r.pretty_name, None);
        assert_eq!(r.name.as_deref(), Some("Arch"));
    }

    #[test]
    fn millidegrees_rejects_out_of_range() {
        assert_eq!(millidegrees_to_celsius("45250"), Some(45.3));
        assert_eq!(millidegrees_to_celsius("0"), None);
        assert_eq!(millidegrees_to_celsius("-5000"), None);
        assert_eq!(millidegrees_to_celsius("200000"), None);
        assert_eq!(millidegrees_to_celsius("garbage"), None);
    }

    #[test]
    fn nvme_controller_names() {
        assert!(is_nvme_controller("nvme0"));
        assert!(is_nvme_controller("nvme12"));
        assert!(!is_nvme_controller("nvme"));
        assert!(!is_nvme_controller("nvme0n1"));
    }
}
