// Composed views handed to the dashboard

use serde::Serialize;
use std::collections::BTreeMap;

use super::{MetricKey, RateSample, Snapshot};

/// Published once per successful tick. Immutable once sent; subscribers share it via `Arc`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceView {
    pub timestamp: u64,
    /// 1-based tick number within the current monitoring session.
    pub tick: u64,
    pub snapshot: Snapshot,
    pub rates: RateSample,
    pub histories: BTreeMap<MetricKey, Vec<f64>>,
}

/// One-shot report: raw snapshot with zero rates, no history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReport {
    pub timestamp: u64,
    pub snapshot: Snapshot,
    pub rates: RateSample,
}
