// Domain models: snapshots, derived rates, published views

mod metric;
mod rate;
mod snapshot;
mod system;
mod view;

pub use metric::{MetricKey, scalar_metrics};
pub use rate::{DiskIoRate, InterfaceRate, RateSample};
pub use snapshot::{
    CoreStat, CpuStats, DiskIoCounters, DiskStat, FanSensor, GpuStat, InterfaceCounters,
    LoadAverage, MemoryStats, Snapshot, TemperatureSensor,
};
pub use system::SystemInfo;
pub use view::{ResourceReport, ResourceView};
