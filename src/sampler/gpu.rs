// GPU readers: nvidia-smi CSV query and /sys/class/drm (AMD, Intel).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::SamplerConfig;
use super::linux::{millidegrees_to_celsius, read_trimmed};
use crate::models::GpuStat;

const NVIDIA_QUERY: &str =
    "--query-gpu=name,utilization.gpu,memory.used,memory.total,temperature.gpu,fan.speed";
const VENDOR_AMD: &str = "0x1002";
const VENDOR_INTEL: &str = "0x8086";
const MIB: u64 = 1024 * 1024;
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Remembers what is not worth re-probing on every tick.
#[derive(Debug, Default)]
pub(super) struct GpuProbe {
    nvidia_smi_missing: AtomicBool,
    pci_names: Mutex<HashMap<PathBuf, String>>,
}

impl GpuProbe {
    pub(super) fn read_all(&self, drm_dir: &Path, config: &SamplerConfig) -> Vec<GpuStat> {
        let mut gpus = Vec::new();
        if config.nvidia_smi && !self.nvidia_smi_missing.load(Ordering::Relaxed) {
            gpus.extend(self.query_nvidia_smi(&config.nvidia_smi_command, config.command_timeout));
        }
        gpus.extend(read_drm(drm_dir, |device| {
            self.pci_name(device, config.command_timeout)
        }));
        gpus
    }

    fn query_nvidia_smi(&self, program: &Path, limit: Duration) -> Vec<GpuStat> {
        let mut command = Command::new(program);
        command.args([NVIDIA_QUERY, "--format=csv,noheader,nounits"]);
        match stdout_within(&mut command, limit) {
            Ok(Some(stdout)) => parse_nvidia_smi(&stdout),
            Ok(None) => Vec::new(),
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    tracing::debug!("nvidia-smi not installed; NVIDIA query disabled");
                    self.nvidia_smi_missing.store(true, Ordering::Relaxed);
                } else {
                    tracing::debug!(error = %e, operation = "nvidia_smi", "nvidia-smi failed");
                }
                Vec::new()
            }
        }
    }

    fn pci_name(&self, device_path: &Path, limit: Duration) -> String {
        if let Ok(cache) = self.pci_names.lock()
            && let Some(name) = cache.get(device_path)
        {
            return name.clone();
        }
        let name = lookup_pci_name(device_path, limit);
        if let Ok(mut cache) = self.pci_names.lock() {
            cache.insert(device_path.to_path_buf(), name.clone());
        }
        name
    }
}

/// Parse `nvidia-smi --format=csv,noheader,nounits` output. Memory is reported in MiB.
/// Unparseable fields (e.g. "[N/A]") become None.
pub fn parse_nvidia_smi(stdout: &str) -> Vec<GpuStat> {
    stdout
        .lines()
        .map(|line| line.split(',').map(str::trim).collect::<Vec<_>>())
        .filter(|parts| parts.len() >= 5)
        .enumerate()
        .map(|(index, parts)| GpuStat {
            id: format!("nvidia{}", index),
            name: parts[0].to_string(),
            vendor: "NVIDIA".into(),
            usage_percent: parts[1].parse().ok(),
            memory_used: parts[2].parse::<u64>().ok().map(|v| v.saturating_mul(MIB)),
            memory_total: parts[3].parse::<u64>().ok().map(|v| v.saturating_mul(MIB)),
            temperature: parts[4].parse().ok(),
            fan_speed: parts.get(5).and_then(|s| s.parse().ok()),
        })
        .collect()
}

/// Scan `card*` entries (not connectors like `card0-DP-1`) for AMD and Intel GPUs.
pub fn read_drm(drm_dir: &Path, pci_name: impl Fn(&Path) -> String) -> Vec<GpuStat> {
    let Ok(entries) = fs::read_dir(drm_dir) else {
        return Vec::new();
    };
    let mut cards: Vec<(String, PathBuf)> = entries
        .flatten()
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .filter(|(name, _)| name.starts_with("card") && !name.contains('-'))
        .collect();
    cards.sort();

    let mut gpus = Vec::new();
    for (card, path) in cards {
        let device = path.join("device");
        let vendor = read_trimmed(&device.join("vendor")).unwrap_or_default();
        match vendor.as_str() {
            VENDOR_AMD => {
                let (temperature, fan_speed) = read_card_hwmon(&device.join("hwmon"));
                gpus.push(GpuStat {
                    id: card,
                    name: pci_name(&device),
                    vendor: "AMD".into(),
                    usage_percent: read_number(&device.join("gpu_busy_percent")),
                    memory_used: read_number(&device.join("mem_info_vram_used")),
                    memory_total: read_number(&device.join("mem_info_vram_total")),
                    temperature,
                    fan_speed,
                });
            }
            VENDOR_INTEL => gpus.push(GpuStat {
                id: card,
                name: pci_name(&device),
                vendor: "Intel".into(),
                ..Default::default()
            }),
            _ => {}
        }
    }
    gpus
}

/// First temp1/fan1 reading found among the card's hwmon chips.
fn read_card_hwmon(hwmon_dir: &Path) -> (Option<f64>, Option<f64>) {
    let mut temperature = None;
    let mut fan = None;
    if let Ok(entries) = fs::read_dir(hwmon_dir) {
        for entry in entries.flatten() {
            let dir = entry.path();
            if temperature.is_none() {
                temperature = read_trimmed(&dir.join("temp1_input"))
                    .and_then(|raw| millidegrees_to_celsius(&raw));
            }
            if fan.is_none() {
                fan = read_number::<u32>(&dir.join("fan1_input")).map(f64::from);
            }
        }
    }
    (temperature, fan)
}

fn read_number<T: std::str::FromStr>(path: &Path) -> Option<T> {
    read_trimmed(path)?.parse().ok()
}

/// Run `command` and return its stdout if it exits successfully within `limit`.
/// A child still running at the deadline is killed and yields `Ok(None)`, as
/// does a non-zero exit. Spawn errors are returned as is.
fn stdout_within(command: &mut Command, limit: Duration) -> io::Result<Option<String>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => {
                if !status.success() {
                    return Ok(None);
                }
                let mut out = Vec::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout.read_to_end(&mut out)?;
                }
                return Ok(Some(String::from_utf8_lossy(&out).into_owned()));
            }
            None if start.elapsed() >= limit => {
                tracing::warn!(
                    program = ?command.get_program(),
                    limit_ms = limit.as_millis() as u64,
                    operation = "run_command",
                    "command timed out; killed"
                );
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            None => std::thread::sleep(CHILD_POLL_INTERVAL),
        }
    }
}

/// Marketing name via `lspci -s <slot>`; "GPU" when unavailable.
fn lookup_pci_name(device_path: &Path, limit: Duration) -> String {
    let slot = fs::read_to_string(device_path.join("uevent"))
        .ok()
        .and_then(|uevent| {
            uevent
                .lines()
                .find_map(|l| l.strip_prefix("PCI_SLOT_NAME="))
                .map(str::to_string)
        });
    if let Some(slot) = slot
        && let Ok(Some(line)) = stdout_within(Command::new("lspci").arg("-s").arg(&slot), limit)
    {
        if let Some((_, name)) = line.split_once(": ") {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    "GPU".into()
}
