// Poll loop: one tokio task samples on a fixed cadence, derives rates against
// the last good snapshot, appends history and publishes an immutable view.
// The task owns `previous` and the history; both die with the session.

use crate::history::{DEFAULT_HISTORY_CAPACITY, History};
use crate::models::{RateSample, ResourceReport, ResourceView, Snapshot, scalar_metrics};
use crate::rates;
use crate::sampler::{SampleError, Sampler};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, interval_at};
use tracing::instrument;

/// Rate limit for "no subscribers" debug log.
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub history_capacity: usize,
    pub sample_timeout_ms: u64,
    pub stats_log_interval_secs: u64,
    pub broadcast_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            sample_timeout_ms: 5_000,
            stats_log_interval_secs: 60,
            broadcast_capacity: 16,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,
    #[error("poll interval must be > 0")]
    ZeroInterval,
    #[error("resource sampling unavailable: {0}")]
    Unavailable(#[source] SampleError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub state: MonitorState,
    pub interval_ms: Option<u64>,
    pub ticks_published: u64,
    pub ticks_failed: u64,
    pub subscribers: usize,
}

#[derive(Debug, Default)]
struct TickCounters {
    published: AtomicU64,
    failed: AtomicU64,
}

impl TickCounters {
    fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

struct Session {
    interval: Duration,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct Control {
    state: MonitorState,
    session: Option<Session>,
}

/// Idle -> Running -> Stopped, and Stopped -> Running again with a fresh session.
///
/// Dropping the monitor drops the shutdown sender, which also ends a running loop.
pub struct Monitor {
    sampler: Arc<dyn Sampler>,
    config: MonitorConfig,
    tx: broadcast::Sender<Arc<ResourceView>>,
    counters: Arc<TickCounters>,
    in_flight: Arc<SampleSlot>,
    control: Mutex<Control>,
}

impl Monitor {
    pub fn new(sampler: Arc<dyn Sampler>, config: MonitorConfig) -> Self {
        let (tx, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            sampler,
            config,
            tx,
            counters: Arc::new(TickCounters::default()),
            in_flight: Arc::new(Mutex::new(None)),
            control: Mutex::new(Control {
                state: MonitorState::Idle,
                session: None,
            }),
        }
    }

    /// Views published after this call. Survives stop/start cycles.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ResourceView>> {
        self.tx.subscribe()
    }

    fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.config.sample_timeout_ms.max(1))
    }

    /// Probe the sampler, then sample immediately and every `interval` after.
    /// A probe failure is returned here once; nothing is retried.
    pub async fn start(&self, interval: Duration) -> Result<(), MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::ZeroInterval);
        }
        let mut control = self.control.lock().await;
        if control.session.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let sampler = self.sampler.clone();
        tokio::task::spawn_blocking(move || sampler.probe())
            .await
            .map_err(|e| MonitorError::Unavailable(SampleError::Join(e.to_string())))?
            .map_err(|e| {
                tracing::error!(error = %e, operation = "probe", "resource sampling unavailable");
                MonitorError::Unavailable(e)
            })?;

        self.counters.reset();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let poll = PollLoop {
            sampler: self.sampler.clone(),
            interval,
            sample_timeout: self.sample_timeout(),
            stats_log_interval: Duration::from_secs(self.config.stats_log_interval_secs.max(1)),
            history: History::new(self.config.history_capacity),
            tx: self.tx.clone(),
            counters: self.counters.clone(),
            in_flight: self.in_flight.clone(),
        };
        let handle = tokio::spawn(poll.run(shutdown_rx));
        control.session = Some(Session {
            interval,
            shutdown_tx,
            handle,
        });
        control.state = MonitorState::Running;
        tracing::info!(interval_ms = interval.as_millis() as u64, "monitor started");
        Ok(())
    }

    /// Stop the loop and wait for it; no view is published after this returns.
    /// History and the previous snapshot are discarded. No-op unless running.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        let Some(session) = control.session.take() else {
            return;
        };
        let _ = session.shutdown_tx.send(());
        if let Err(e) = session.handle.await {
            tracing::warn!(error = %e, operation = "stop", "poll loop ended abnormally");
        }
        control.state = MonitorState::Stopped;
        tracing::info!(
            ticks_published = self.counters.published.load(Ordering::Relaxed),
            ticks_failed = self.counters.failed.load(Ordering::Relaxed),
            "monitor stopped"
        );
    }

    pub async fn status(&self) -> MonitorStatus {
        let control = self.control.lock().await;
        MonitorStatus {
            state: control.state,
            interval_ms: control
                .session
                .as_ref()
                .map(|s| s.interval.as_millis() as u64),
            ticks_published: self.counters.published.load(Ordering::Relaxed),
            ticks_failed: self.counters.failed.load(Ordering::Relaxed),
            subscribers: self.tx.receiver_count(),
        }
    }

    /// Raw snapshot with zero rates; touches neither history nor the loop's previous snapshot.
    /// Fails with `Stalled` while another sample (loop tick or one-shot) is still gathering.
    #[instrument(skip(self), fields(operation = "sample_once"))]
    pub async fn sample_once(&self) -> Result<ResourceReport, SampleError> {
        let snapshot =
            sample_bounded(self.sampler.clone(), self.sample_timeout(), &self.in_flight).await?;
        let rates = RateSample::zero(&snapshot);
        Ok(ResourceReport {
            timestamp: unix_millis(),
            snapshot,
            rates,
        })
    }
}

type SampleTask = JoinHandle<Result<Snapshot, SampleError>>;

/// The one sample allowed to be gathering at a time, shared by the poll loop
/// and `sample_once`.
type SampleSlot = Mutex<Option<SampleTask>>;

/// Run one sample on the blocking pool, bounded by `timeout`. The task lives in
/// `slot` until it completes, so a timed-out or cancelled sample stays parked
/// there and further calls fail with `Stalled` instead of stacking a second
/// sample on top of it.
async fn sample_bounded(
    sampler: Arc<dyn Sampler>,
    timeout: Duration,
    slot: &SampleSlot,
) -> Result<Snapshot, SampleError> {
    let Ok(mut in_flight) = slot.try_lock() else {
        return Err(SampleError::Stalled);
    };
    if in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
        return Err(SampleError::Stalled);
    }
    let task = in_flight.insert(tokio::task::spawn_blocking(move || sampler.sample()));
    let outcome = tokio::time::timeout(timeout, task).await;
    match outcome {
        Ok(joined) => {
            *in_flight = None;
            joined.map_err(|e| SampleError::Join(e.to_string()))?
        }
        Err(_) => Err(SampleError::TimedOut(timeout)),
    }
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

struct PollLoop {
    sampler: Arc<dyn Sampler>,
    interval: Duration,
    sample_timeout: Duration,
    stats_log_interval: Duration,
    history: History,
    tx: broadcast::Sender<Arc<ResourceView>>,
    counters: Arc<TickCounters>,
    in_flight: Arc<SampleSlot>,
}

impl PollLoop {
    #[instrument(name = "poll_loop", skip_all, fields(interval_ms = self.interval.as_millis() as u64))]
    async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        // First tick fires immediately. A slow sample pushes the next tick back
        // rather than bunching ticks up.
        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats_log_tick = interval_at(
            Instant::now() + self.stats_log_interval,
            self.stats_log_interval,
        );
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Last good snapshot and when it was taken.
        let mut previous: Option<(Snapshot, Instant)> = None;
        let mut tick_no: u64 = 0;
        let mut last_no_receivers_log: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = tick.tick() => {
                    let sampler = self.sampler.clone();
                    let timeout = self.sample_timeout;
                    let slot = self.in_flight.clone();
                    let outcome = tokio::select! {
                        biased;
                        _ = &mut shutdown_rx => break,
                        outcome = sample_bounded(sampler, timeout, &slot) => outcome,
                    };
                    let snapshot = match outcome {
                        Ok(s) => s,
                        Err(e) => {
                            // previous stays as is: the next good tick diffs against it.
                            self.counters.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                error = %e,
                                operation = "sample",
                                "sampling failed; tick skipped"
                            );
                            continue;
                        }
                    };

                    let now = Instant::now();
                    let rates = match &previous {
                        Some((prev, at)) => rates::derive(Some(prev), &snapshot, now.duration_since(*at)),
                        None => RateSample::zero(&snapshot),
                    };
                    self.history.extend(scalar_metrics(&snapshot, &rates));
                    tick_no += 1;
                    let view = Arc::new(ResourceView {
                        timestamp: unix_millis(),
                        tick: tick_no,
                        snapshot: snapshot.clone(),
                        rates,
                        histories: self.history.snapshot(),
                    });
                    self.counters.published.fetch_add(1, Ordering::Relaxed);
                    if self.tx.send(view).is_err() {
                        let should_log = last_no_receivers_log
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL);
                        if should_log {
                            tracing::debug!(
                                operation = "publish_view",
                                "No subscribers; broadcast channel has no receivers"
                            );
                            last_no_receivers_log = Some(Instant::now());
                        }
                    }
                    previous = Some((snapshot, now));
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ticks_published = self.counters.published.load(Ordering::Relaxed),
                        ticks_failed = self.counters.failed.load(Ordering::Relaxed),
                        subscribers = self.tx.receiver_count(),
                        metrics_tracked = self.history.len(),
                        "monitor stats"
                    );
                }
            }
        }
        tracing::debug!("poll loop shutting down");
    }
}
