// Shared test helpers: snapshot builders and a scripted sampler

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sysdash::models::*;
use sysdash::sampler::{SampleError, Sampler};
use tokio::sync::broadcast;

pub fn snapshot_with(network: &[(&str, u64, u64)], disk_io: &[(&str, u64, u64, u64)]) -> Snapshot {
    Snapshot {
        network: network
            .iter()
            .map(|&(name, rx, tx)| InterfaceCounters {
                name: name.into(),
                rx_bytes: rx,
                tx_bytes: tx,
            })
            .collect(),
        disk_io: disk_io
            .iter()
            .map(|&(name, read, write, io_ms)| DiskIoCounters {
                name: name.into(),
                read_bytes: read,
                write_bytes: write,
                io_ms,
            })
            .collect(),
        ..Default::default()
    }
}

pub fn net_snapshot(rx: u64, tx: u64) -> Snapshot {
    snapshot_with(&[("eth0", rx, tx)], &[])
}

pub fn cpu_snapshot(usage_percent: f64) -> Snapshot {
    Snapshot {
        cpu: CpuStats {
            model: "test".into(),
            usage_percent,
            cores: vec![],
        },
        ..Default::default()
    }
}

pub enum Step {
    Ok(Snapshot),
    Fail,
    Slow(Duration, Snapshot),
}

/// Plays back `steps` in order; once exhausted, returns counters that grow by
/// 1000 bytes per call on `eth0` and `sda`.
#[derive(Default)]
pub struct ScriptedSampler {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    in_progress: AtomicUsize,
    max_in_progress: AtomicUsize,
    pub probe_fails: bool,
}

impl ScriptedSampler {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    pub fn counting() -> Self {
        Self::default()
    }

    pub fn failing_probe() -> Self {
        Self {
            probe_fails: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_progress(&self) -> usize {
        self.max_in_progress.load(Ordering::SeqCst)
    }
}

impl Sampler for ScriptedSampler {
    fn sample(&self) -> Result<Snapshot, SampleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        let now = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_progress.fetch_max(now, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        let result = match step {
            Some(Step::Ok(s)) => Ok(s),
            Some(Step::Fail) => Err(SampleError::Join("scripted failure".into())),
            Some(Step::Slow(delay, s)) => {
                std::thread::sleep(delay);
                Ok(s)
            }
            None => Ok(snapshot_with(
                &[("eth0", n * 1000, n * 500)],
                &[("sda", n * 4096, n * 8192, n * 10)],
            )),
        };
        self.in_progress.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn probe(&self) -> Result<(), SampleError> {
        if self.probe_fails {
            return Err(SampleError::Io {
                path: "/proc".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(())
    }
}

pub fn shared(sampler: ScriptedSampler) -> Arc<ScriptedSampler> {
    Arc::new(sampler)
}

/// Next published view, failing the test after 3 seconds.
pub async fn next_view(rx: &mut broadcast::Receiver<Arc<ResourceView>>) -> Arc<ResourceView> {
    tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("timed out waiting for a published view")
        .expect("broadcast channel closed")
}

pub fn assert_all_rates_zero(rates: &RateSample) {
    for iface in &rates.network {
        assert_eq!(iface.rx_bytes_per_sec, 0.0, "{} rx", iface.name);
        assert_eq!(iface.tx_bytes_per_sec, 0.0, "{} tx", iface.name);
    }
    for disk in &rates.disk_io {
        assert_eq!(disk.read_bytes_per_sec, 0.0, "{} read", disk.name);
        assert_eq!(disk.write_bytes_per_sec, 0.0, "{} write", disk.name);
        assert_eq!(disk.utilization_percent, 0.0, "{} util", disk.name);
    }
}
