use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::monitor::MonitorConfig;
use crate::sampler::SamplerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub sample_interval_ms: u64,
    /// Samples kept per metric (300 at 1 Hz is about 5 minutes).
    pub history_capacity: usize,
    /// Upper bound on one sample; a slower sample counts as a failed tick.
    pub sample_timeout_ms: u64,
    /// How often to log monitor stats (ticks published/failed, subscribers) at INFO level.
    pub stats_log_interval_secs: u64,
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

fn default_autostart() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of views kept in the broadcast channel (slow subscribers may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsConfig {
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    #[serde(default = "default_sys_root")]
    pub sys_root: PathBuf,
    #[serde(default = "default_nvidia_smi")]
    pub nvidia_smi: bool,
    #[serde(default = "default_nvidia_smi_command")]
    pub nvidia_smi_command: PathBuf,
    /// External helpers still running after this are killed; keep it below
    /// monitoring.sample_timeout_ms so a hung helper only costs its own reading.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_sys_root() -> PathBuf {
    PathBuf::from("/sys")
}

fn default_nvidia_smi() -> bool {
    true
}

fn default_nvidia_smi_command() -> PathBuf {
    PathBuf::from("nvidia-smi")
}

fn default_command_timeout_ms() -> u64 {
    1_000
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            proc_root: default_proc_root(),
            sys_root: default_sys_root(),
            nvidia_smi: default_nvidia_smi(),
            nvidia_smi_command: default_nvidia_smi_command(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.history_capacity > 0,
            "monitoring.history_capacity must be > 0, got {}",
            self.monitoring.history_capacity
        );
        anyhow::ensure!(
            self.monitoring.sample_timeout_ms > 0,
            "monitoring.sample_timeout_ms must be > 0, got {}",
            self.monitoring.sample_timeout_ms
        );
        anyhow::ensure!(
            self.sensors.command_timeout_ms > 0
                && self.sensors.command_timeout_ms < self.monitoring.sample_timeout_ms,
            "sensors.command_timeout_ms must be > 0 and below monitoring.sample_timeout_ms ({}), got {}",
            self.monitoring.sample_timeout_ms,
            self.sensors.command_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            history_capacity: self.monitoring.history_capacity,
            sample_timeout_ms: self.monitoring.sample_timeout_ms,
            stats_log_interval_secs: self.monitoring.stats_log_interval_secs,
            broadcast_capacity: self.publishing.broadcast_capacity,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            proc_root: self.sensors.proc_root.clone(),
            sys_root: self.sensors.sys_root.clone(),
            nvidia_smi: self.sensors.nvidia_smi,
            nvidia_smi_command: self.sensors.nvidia_smi_command.clone(),
            command_timeout: Duration::from_millis(self.sensors.command_timeout_ms),
        }
    }
}
