// System sampling via sysinfo plus Linux procfs/sysfs readers

mod gpu;
pub mod linux;

pub use gpu::{parse_nvidia_smi, read_drm};

use crate::models::*;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tracing::instrument;

/// Sampling failed for one tick (or, from `probe`, for good).
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
    #[error("{path} unreadable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("platform not supported by sysinfo")]
    Unsupported,
    #[error("sampling task failed: {0}")]
    Join(String),
    #[error("sampling timed out after {0:?}")]
    TimedOut(Duration),
    #[error("previous sample still in flight")]
    Stalled,
}

/// One system snapshot per call. Absent hardware is not an error: it yields
/// empty lists / `None` fields. Implementations may block on OS calls; the
/// poll loop runs them on the blocking pool.
pub trait Sampler: Send + Sync + 'static {
    fn sample(&self) -> Result<Snapshot, SampleError>;

    /// Whether the OS interface is usable at all. Checked once per `start`.
    fn probe(&self) -> Result<(), SampleError> {
        Ok(())
    }
}

/// Where the Linux readers look; overridable for tests and containers.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
    pub nvidia_smi: bool,
    pub nvidia_smi_command: PathBuf,
    /// Deadline for external helpers (nvidia-smi, lspci); a hung one is killed.
    pub command_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            nvidia_smi: true,
            nvidia_smi_command: PathBuf::from("nvidia-smi"),
            command_timeout: Duration::from_millis(1_000),
        }
    }
}

pub struct SysinfoSampler {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
    gpus: gpu::GpuProbe,
    config: SamplerConfig,
    cpu_model: String,
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

impl SysinfoSampler {
    pub fn new(config: SamplerConfig) -> Self {
        let mut sys = System::new_all();
        // Baseline so the first real sample has a CPU usage delta to work from.
        sys.refresh_cpu_all();
        let cpu_model = linux::read_cpu_model(&config.proc_root)
            .or_else(|| {
                sys.cpus()
                    .first()
                    .map(|c| c.brand().to_string())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| "Unknown".into());
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            gpus: gpu::GpuProbe::default(),
            config,
            cpu_model,
        }
    }

    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "system_info"))]
    pub fn system_info(&self) -> SystemInfo {
        let release = linux::read_os_release(std::path::Path::new("/etc/os-release"));
        let os_name = release
            .name
            .or_else(System::name)
            .unwrap_or_else(|| std::env::consts::OS.into());
        let os_version = release
            .version
            .or_else(System::os_version)
            .unwrap_or_default();
        let os_pretty = release
            .pretty_name
            .unwrap_or_else(|| format!("{} {}", os_name, os_version).trim().to_string());
        let cpu_count = self
            .sys
            .lock()
            .map(|s| s.cpus().len() as u32)
            .unwrap_or(0);
        SystemInfo {
            os_name,
            os_version,
            os_pretty,
            kernel: System::kernel_version().unwrap_or_default(),
            hostname: System::host_name().unwrap_or_default(),
            arch: std::env::consts::ARCH.into(),
            cpu_model: self.cpu_model.clone(),
            cpu_count,
        }
    }

    fn read_cpu_and_memory(&self) -> Result<(CpuStats, MemoryStats), SampleError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|_| SampleError::Poisoned("sysinfo system"))?;
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let cores = sys
            .cpus()
            .iter()
            .map(|c| CoreStat {
                name: c.name().to_string(),
                usage_percent: (c.cpu_usage() as f64).clamp(0.0, 100.0),
                frequency_mhz: c.frequency(),
            })
            .collect();
        let cpu = CpuStats {
            model: self.cpu_model.clone(),
            usage_percent: (sys.global_cpu_usage() as f64).clamp(0.0, 100.0),
            cores,
        };

        let total = sys.total_memory();
        let memory = MemoryStats {
            total,
            used: total.saturating_sub(sys.available_memory()),
            swap_total: sys.total_swap(),
            swap_used: sys.used_swap(),
        };
        Ok((cpu, memory))
    }

    fn read_disks(&self) -> Result<Vec<DiskStat>, SampleError> {
        let mut disks = self
            .disks
            .lock()
            .map_err(|_| SampleError::Poisoned("sysinfo disks"))?;
        disks.refresh(true);
        Ok(disks
            .list()
            .iter()
            .filter(|d| d.total_space() > 0)
            .map(|d| DiskStat {
                name: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_string_lossy().into_owned(),
                total_space: d.total_space(),
                available_space: d.available_space(),
            })
            .collect())
    }

    fn read_network(&self) -> Result<Vec<InterfaceCounters>, SampleError> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|_| SampleError::Poisoned("sysinfo networks"))?;
        // `true` drops interfaces that went away, so unplugged adapters stop reporting.
        networks.refresh(true);
        let mut out: Vec<InterfaceCounters> = networks
            .list()
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name: name.clone(),
                rx_bytes: data.total_received(),
                tx_bytes: data.total_transmitted(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

impl Sampler for SysinfoSampler {
    #[instrument(skip(self), fields(sampler = "sysinfo", operation = "sample"))]
    fn sample(&self) -> Result<Snapshot, SampleError> {
        let (cpu, memory) = self.read_cpu_and_memory()?;
        let disks = self.read_disks()?;
        let network = self.read_network()?;

        let load = System::load_average();
        let sys_root = &self.config.sys_root;
        let (temperatures, fans) = linux::read_hwmon(&sys_root.join("class/hwmon"), sys_root);
        let gpus = self
            .gpus
            .read_all(&sys_root.join("class/drm"), &self.config);
        let disk_io = linux::read_diskstats(&self.config.proc_root, sys_root);

        Ok(Snapshot {
            cpu,
            memory,
            load_average: LoadAverage {
                one: load.one,
                five: load.five,
                fifteen: load.fifteen,
            },
            uptime_secs: System::uptime(),
            gpus,
            temperatures,
            fans,
            disks,
            network,
            disk_io,
        })
    }

    fn probe(&self) -> Result<(), SampleError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SampleError::Unsupported);
        }
        if cfg!(target_os = "linux") {
            let path = self.config.proc_root.clone();
            std::fs::read_dir(&path).map_err(|source| SampleError::Io { path, source })?;
        }
        self.sys
            .lock()
            .map(|_| ())
            .map_err(|_| SampleError::Poisoned("sysinfo system"))
    }
}
