// Model serialization tests (JSON camelCase, metric keys, scalar series)

mod common;

use std::collections::BTreeMap;
use sysdash::models::*;

#[test]
fn test_snapshot_serialization_camel_case() {
    let snapshot = common::snapshot_with(&[("eth0", 1, 2)], &[("sda", 3, 4, 5)]);
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"loadAverage\""));
    assert!(json.contains("\"uptimeSecs\""));
    assert!(json.contains("\"diskIo\""));
    assert!(json.contains("\"rxBytes\":1"));
    assert!(json.contains("\"ioMs\":5"));
    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn test_gpu_unavailable_fields_serialize_as_null() {
    let gpu = GpuStat {
        id: "card0".into(),
        name: "GPU".into(),
        vendor: "Intel".into(),
        ..Default::default()
    };
    let json: serde_json::Value = serde_json::to_value(&gpu).unwrap();
    assert!(json["usagePercent"].is_null());
    assert!(json["memoryTotal"].is_null());
    assert!(json["fanSpeed"].is_null());
    assert_eq!(json["vendor"], "Intel");
}

#[test]
fn test_memory_percentages() {
    let mem = MemoryStats {
        total: 1000,
        used: 250,
        swap_total: 0,
        swap_used: 0,
    };
    assert_eq!(mem.usage_percent(), 25.0);
    // No swap configured is 0%, not NaN.
    assert_eq!(mem.swap_percent(), 0.0);
}

#[test]
fn test_metric_key_display() {
    assert_eq!(MetricKey::Cpu.to_string(), "cpu");
    assert_eq!(MetricKey::Memory.to_string(), "memory");
    assert_eq!(MetricKey::GpuUsage("card0".into()).to_string(), "gpu.card0.usage");
    assert_eq!(MetricKey::NetRx("eth0".into()).to_string(), "net.eth0.rx");
    assert_eq!(MetricKey::NetTx("eth0".into()).to_string(), "net.eth0.tx");
    assert_eq!(MetricKey::DiskRead("sda".into()).to_string(), "disk.sda.read");
    assert_eq!(MetricKey::DiskWrite("sda".into()).to_string(), "disk.sda.write");
    assert_eq!(MetricKey::DiskUtil("sda".into()).to_string(), "disk.sda.util");
}

#[test]
fn test_histories_serialize_as_json_object() {
    let mut histories = BTreeMap::new();
    histories.insert(MetricKey::Cpu, vec![1.0, 2.0]);
    histories.insert(MetricKey::NetRx("eth0".into()), vec![500.0]);
    let view = ResourceView {
        timestamp: 42,
        tick: 1,
        snapshot: Snapshot::default(),
        rates: RateSample::default(),
        histories,
    };
    let json: serde_json::Value = serde_json::to_value(&view).unwrap();
    assert_eq!(json["timestamp"], 42);
    assert_eq!(json["histories"]["cpu"], serde_json::json!([1.0, 2.0]));
    assert_eq!(json["histories"]["net.eth0.rx"], serde_json::json!([500.0]));
    assert!(json["rates"]["elapsedSecs"].is_number());
}

#[test]
fn test_scalar_metrics_cover_every_series() {
    let mut snapshot = common::snapshot_with(&[("eth0", 0, 0)], &[("sda", 0, 0, 0)]);
    snapshot.cpu.usage_percent = 12.5;
    snapshot.memory = MemoryStats {
        total: 200,
        used: 100,
        swap_total: 100,
        swap_used: 10,
    };
    snapshot.gpus = vec![
        GpuStat {
            id: "nvidia0".into(),
            usage_percent: Some(70.0),
            ..Default::default()
        },
        GpuStat {
            id: "card1".into(),
            usage_percent: None,
            ..Default::default()
        },
    ];
    let rates = RateSample {
        elapsed_secs: 1.0,
        network: vec![InterfaceRate {
            name: "eth0".into(),
            rx_bytes_per_sec: 10.0,
            tx_bytes_per_sec: 20.0,
        }],
        disk_io: vec![DiskIoRate {
            name: "sda".into(),
            read_bytes_per_sec: 1.0,
            write_bytes_per_sec: 2.0,
            utilization_percent: 3.0,
        }],
    };
    let metrics: BTreeMap<MetricKey, f64> = scalar_metrics(&snapshot, &rates).into_iter().collect();
    assert_eq!(metrics.len(), 9);
    assert_eq!(metrics[&MetricKey::Cpu], 12.5);
    assert_eq!(metrics[&MetricKey::Memory], 50.0);
    assert_eq!(metrics[&MetricKey::Swap], 10.0);
    assert_eq!(metrics[&MetricKey::GpuUsage("nvidia0".into())], 70.0);
    assert!(!metrics.contains_key(&MetricKey::GpuUsage("card1".into())));
    assert_eq!(metrics[&MetricKey::NetRx("eth0".into())], 10.0);
    assert_eq!(metrics[&MetricKey::NetTx("eth0".into())], 20.0);
    assert_eq!(metrics[&MetricKey::DiskRead("sda".into())], 1.0);
    assert_eq!(metrics[&MetricKey::DiskWrite("sda".into())], 2.0);
    assert_eq!(metrics[&MetricKey::DiskUtil("sda".into())], 3.0);
}

#[test]
fn test_zero_rates_mirror_snapshot_devices() {
    let snapshot = common::snapshot_with(&[("eth0", 9, 9), ("lo", 1, 1)], &[("sda", 1, 1, 1)]);
    let rates = RateSample::zero(&snapshot);
    assert_eq!(rates.network.len(), 2);
    assert!(rates.interface("lo").is_some());
    assert!(rates.disk("sda").is_some());
    common::assert_all_rates_zero(&rates);
}
