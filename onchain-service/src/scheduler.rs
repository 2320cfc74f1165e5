//! Scheduler (C10): one long-lived tick loop per configured `(asset,
//! timeframe)`, fed by a shared `tokio::time::interval` (SPEC_FULL.md §4.10,
//! REDESIGN FLAGS' "task + channel" architecture). Ticks never overlap;
//! a tick still running when the next one is due increments
//! `tick_skipped` instead of queuing up, grounded on
//! `examples/original_source/onchain_intel_product/scheduler.py`'s
//! `SchedulerConfig.timeframes` + per-run `scheduler_state` bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use onchain_signal::{AddressTagSource, KillSwitchConfig, TierThresholds};
use onchain_sources::MultiSourceProvider;
use onchain_types::{AssetType, TimeframeType};
use sqlx::PgPool;

use crate::error::Error;
use crate::pipeline::{run_tick, PipelineContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickStatus {
    Success,
    Error,
}

/// Operational diagnostics for one `(asset, timeframe)` tick loop
/// (SPEC_FULL.md §10, grounded on the original's per-run state update).
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerState {
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub status: Option<TickStatus>,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        SchedulerState {
            last_run: None,
            next_run: None,
            status: None,
            duration_ms: 0,
            error_message: None,
        }
    }
}

struct TrackedTask {
    asset: AssetType,
    timeframe: TimeframeType,
    state: Arc<RwLock<SchedulerState>>,
    tick_skipped: Arc<AtomicU64>,
    handle: JoinHandle<()>,
    in_flight: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

/// Owns one `tokio::task` per configured `(asset, timeframe)`; `stop()`
/// aborts the ticker intervals and waits for any in-flight tick to finish
/// (graceful per spec.md §4.10: "finish the in-flight tick, then exit").
pub struct Scheduler {
    tasks: Vec<TrackedTask>,
}

impl Scheduler {
    /// Starts one task per `(asset, timeframe)` pair immediately; the first
    /// tick fires after `interval` has elapsed, matching
    /// `tokio::time::interval`'s default (no immediate first tick skip is
    /// requested, so behavior matches a plain periodic timer).
    pub fn start(
        pairs: Vec<(AssetType, TimeframeType)>,
        interval: std::time::Duration,
        provider: Arc<MultiSourceProvider>,
        pool: PgPool,
        tier_thresholds: TierThresholds,
        tags: Arc<dyn AddressTagSource>,
        kill_switch: KillSwitchConfig,
    ) -> Self {
        let mut tasks = Vec::with_capacity(pairs.len());

        for (asset, timeframe) in pairs {
            let state = Arc::new(RwLock::new(SchedulerState::default()));
            let tick_skipped = Arc::new(AtomicU64::new(0));

            let provider = Arc::clone(&provider);
            let pool = pool.clone();
            let tags = Arc::clone(&tags);
            let state_handle = Arc::clone(&state);
            let tick_skipped_handle = Arc::clone(&tick_skipped);
            let in_flight: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>> =
                Arc::new(tokio::sync::Mutex::new(None));
            let in_flight_loop = Arc::clone(&in_flight);

            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);

                loop {
                    ticker.tick().await;

                    {
                        let slot = in_flight_loop.lock().await;
                        if let Some(prev) = slot.as_ref() {
                            if !prev.is_finished() {
                                tick_skipped_handle.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }
                        }
                    }

                    let provider = Arc::clone(&provider);
                    let pool = pool.clone();
                    let tags = Arc::clone(&tags);
                    let state_handle = Arc::clone(&state_handle);

                    // Cancellation/timeouts (spec.md §5): a tick's upper bound is
                    // interval - ε, so a wedged tick is aborted before the next one
                    // would otherwise be due.
                    let deadline = interval.mul_f64(0.9);

                    let child = tokio::spawn(async move {
                        let start = Utc::now();
                        let ctx = PipelineContext {
                            provider: &provider,
                            pool: &pool,
                            tier_thresholds,
                            tags: tags.as_ref(),
                            kill_switch,
                        };

                        let result = match tokio::time::timeout(deadline, run_tick(&ctx, asset, timeframe)).await
                        {
                            Ok(result) => result,
                            Err(_) => Err(Error::TickTimeout),
                        };
                        let duration_ms = (Utc::now() - start).num_milliseconds().max(0) as u64;

                        let mut state = state_handle.write().await;
                        state.last_run = Some(start);
                        state.next_run =
                            Some(start + chrono::Duration::from_std(interval).unwrap_or_default());
                        state.duration_ms = duration_ms;
                        match result {
                            Ok(context) => {
                                log::info!(
                                    "tick complete asset={asset} timeframe={timeframe} state={:?}",
                                    context.state
                                );
                                state.status = Some(TickStatus::Success);
                                state.error_message = None;
                            }
                            Err(err) => {
                                log::error!("tick failed asset={asset} timeframe={timeframe}: {err}");
                                state.status = Some(TickStatus::Error);
                                state.error_message = Some(err.to_string());
                            }
                        }
                    });

                    *in_flight_loop.lock().await = Some(child);
                }
            });

            tasks.push(TrackedTask {
                asset,
                timeframe,
                state,
                tick_skipped,
                handle,
                in_flight,
            });
        }

        Scheduler { tasks }
    }

    /// Stops scheduling new ticks immediately (aborting the ticker loop
    /// between `interval.tick()` calls), then awaits whatever tick is
    /// currently in flight to completion before returning — graceful per
    /// spec.md §4.10: "finish the in-flight tick, then exit".
    pub async fn stop(self) {
        for task in self.tasks {
            task.handle.abort();
            let _ = task.handle.await;

            if let Some(child) = task.in_flight.lock().await.take() {
                let _ = child.await;
            }
        }
    }

    pub async fn state_snapshot(&self) -> Vec<(AssetType, TimeframeType, SchedulerState, u64)> {
        let mut snapshots = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            snapshots.push((
                task.asset,
                task.timeframe,
                task.state.read().await.clone(),
                task.tick_skipped.load(Ordering::Relaxed),
            ));
        }
        snapshots
    }

    /// Cloned handles to each tick loop's state, for an HTTP shell that
    /// wants to poll diagnostics without owning (and eventually `stop`-ing)
    /// the scheduler itself.
    pub fn diagnostics_handles(&self) -> Vec<SchedulerHandle> {
        self.tasks
            .iter()
            .map(|task| SchedulerHandle {
                asset: task.asset,
                timeframe: task.timeframe,
                state: Arc::clone(&task.state),
                tick_skipped: Arc::clone(&task.tick_skipped),
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct SchedulerHandle {
    pub asset: AssetType,
    pub timeframe: TimeframeType,
    state: Arc<RwLock<SchedulerState>>,
    tick_skipped: Arc<AtomicU64>,
}

impl SchedulerHandle {
    pub async fn snapshot(&self) -> (SchedulerState, u64) {
        (
            self.state.read().await.clone(),
            self.tick_skipped.load(Ordering::Relaxed),
        )
    }
}
