// History ring: capacity, eviction order, per-key independence

use sysdash::history::{DEFAULT_HISTORY_CAPACITY, History};
use sysdash::models::MetricKey;

#[test]
fn test_capacity_three_keeps_last_three() {
    let mut h = History::new(3);
    for v in [1.0, 2.0, 3.0, 4.0] {
        h.append(MetricKey::Cpu, v);
    }
    assert_eq!(h.series(&MetricKey::Cpu), vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_overflow_drops_single_oldest() {
    let n = 5;
    let mut h = History::new(n);
    for v in 0..=n {
        h.append(MetricKey::Memory, v as f64);
    }
    let series = h.series(&MetricKey::Memory);
    assert_eq!(series.len(), n);
    assert!(!series.contains(&0.0));
    assert_eq!(series.first(), Some(&1.0));
    assert_eq!(series.last(), Some(&(n as f64)));
}

#[test]
fn test_series_never_exceeds_capacity() {
    let mut h = History::new(10);
    for v in 0..1000 {
        h.append(MetricKey::NetRx("eth0".into()), v as f64);
        assert!(h.series(&MetricKey::NetRx("eth0".into())).len() <= 10);
    }
}

#[test]
fn test_unknown_key_is_empty() {
    let h = History::default();
    assert_eq!(h.capacity(), DEFAULT_HISTORY_CAPACITY);
    assert!(h.series(&MetricKey::DiskUtil("sda".into())).is_empty());
    assert!(h.is_empty());
}

#[test]
fn test_keys_are_independent() {
    let mut h = History::new(2);
    h.append(MetricKey::NetRx("eth0".into()), 1.0);
    h.append(MetricKey::NetRx("eth0".into()), 2.0);
    h.append(MetricKey::NetRx("eth0".into()), 3.0);
    // Appears later: no back-fill.
    h.append(MetricKey::NetRx("usb0".into()), 9.0);
    assert_eq!(h.series(&MetricKey::NetRx("eth0".into())), vec![2.0, 3.0]);
    assert_eq!(h.series(&MetricKey::NetRx("usb0".into())), vec![9.0]);
    assert_eq!(h.len(), 2);
}

#[test]
fn test_zero_capacity_is_clamped_to_one() {
    let mut h = History::new(0);
    h.append(MetricKey::Cpu, 1.0);
    h.append(MetricKey::Cpu, 2.0);
    assert_eq!(h.series(&MetricKey::Cpu), vec![2.0]);
}

#[test]
fn test_snapshot_is_sorted_copy() {
    let mut h = History::new(4);
    h.extend([
        (MetricKey::Swap, 1.0),
        (MetricKey::Cpu, 2.0),
        (MetricKey::GpuUsage("card0".into()), 3.0),
    ]);
    let snap = h.snapshot();
    let keys: Vec<_> = snap.keys().cloned().collect();
    assert_eq!(
        keys,
        vec![
            MetricKey::Cpu,
            MetricKey::Swap,
            MetricKey::GpuUsage("card0".into())
        ]
    );
    h.append(MetricKey::Cpu, 5.0);
    assert_eq!(snap[&MetricKey::Cpu], vec![2.0]);
}
