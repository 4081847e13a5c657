//! Overview loading
//!
//! Every metric screen needs the same data: the four range queries over a
//! trailing window, joined, then reduced by the calculators. This module does
//! that once for all of them.
//!
//! Loading stages:
//! 1. Resolve the active adapter from the provider
//! 2. Fan out sleep / HRV / activity / energy queries and join them
//! 3. Reduce the snapshot into an `OverviewReport`
//!
//! A failure in any query fails the whole load. Loads observe a
//! `CancellationToken`; cancelling drops the in-flight queries.

use crate::adapters::WearableAdapter;
use crate::error::{Result, WearableError};
use crate::metrics::{
    calculate_activity_metrics, calculate_energy_metrics, calculate_hrv_metrics,
    calculate_resting_hr_metrics, calculate_sleep_metrics, ActivityMetrics, EnergyMetrics,
    HrvMetrics, RestingHrMetrics, SleepMetrics,
};
use crate::provider::WearableProvider;
use crate::range::TimeRange;
use crate::types::{DailyActivity, EnergySignal, HrvSummary, SleepSummary, SourceId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

/// User-facing message for any failed load
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data";

/// Default trailing window in days
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Longest window a configuration may request
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Raw records for one window, as returned by the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableSnapshot {
    pub range: TimeRange,
    pub sleep: Vec<SleepSummary>,
    pub hrv: Vec<HrvSummary>,
    pub activity: Vec<DailyActivity>,
    pub energy: Vec<EnergySignal>,
}

/// Run the four range queries concurrently and join them.
///
/// Returns `WearableError::Cancelled` as soon as `cancel` fires; otherwise the
/// first query error, unchanged.
pub async fn load_snapshot(
    adapter: &dyn WearableAdapter,
    range: &TimeRange,
    cancel: &CancellationToken,
) -> Result<WearableSnapshot> {
    let fetch = async {
        tokio::try_join!(
            adapter.sleep(range),
            adapter.hrv(range),
            adapter.daily_activity(range),
            adapter.energy_signal(range),
        )
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WearableError::Cancelled),
        result = fetch => {
            let (sleep, hrv, activity, energy) = result?;
            Ok(WearableSnapshot {
                range: *range,
                sleep,
                hrv,
                activity,
                energy,
            })
        }
    }
}

/// Display-ready metrics for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewReport {
    pub report_id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub source: SourceId,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub sleep: SleepMetrics,
    pub hrv: HrvMetrics,
    pub resting_hr: RestingHrMetrics,
    pub energy: EnergyMetrics,
    pub activity: ActivityMetrics,
}

impl OverviewReport {
    pub fn from_snapshot(source: SourceId, snapshot: &WearableSnapshot) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            source,
            first_day: snapshot.range.first_day(),
            last_day: snapshot.range.last_day(),
            sleep: calculate_sleep_metrics(&snapshot.sleep),
            hrv: calculate_hrv_metrics(&snapshot.hrv),
            resting_hr: calculate_resting_hr_metrics(&snapshot.hrv),
            energy: calculate_energy_metrics(&snapshot.energy),
            activity: calculate_activity_metrics(&snapshot.activity),
        }
    }
}

/// Outcome of a load, ready for a screen to render
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loaded(Box<OverviewReport>),
    Failed { message: String },
    Cancelled,
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }
}

/// Shared loader used by every metric screen
#[derive(Debug, Clone)]
pub struct OverviewLoader {
    provider: WearableProvider,
    window_days: u32,
}

impl OverviewLoader {
    pub fn new(provider: WearableProvider) -> Self {
        Self::with_window(provider, DEFAULT_WINDOW_DAYS)
    }

    pub fn with_window(provider: WearableProvider, window_days: u32) -> Self {
        Self {
            provider,
            window_days,
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Fetch and reduce the window ending on `last_day`, surfacing the raw error
    pub async fn fetch(
        &self,
        last_day: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<OverviewReport> {
        let range = TimeRange::trailing_days(last_day, self.window_days)?;
        let adapter = self.provider.adapter();

        tracing::debug!(
            source = %adapter.source(),
            first_day = %range.first_day(),
            last_day = %range.last_day(),
            "loading overview"
        );

        let snapshot = load_snapshot(adapter.as_ref(), &range, cancel).await?;
        Ok(OverviewReport::from_snapshot(adapter.source(), &snapshot))
    }

    /// Load the window ending on `last_day` into a render state
    pub async fn load(&self, last_day: NaiveDate, cancel: &CancellationToken) -> LoadState {
        match self.fetch(last_day, cancel).await {
            Ok(report) => LoadState::Loaded(Box::new(report)),
            Err(WearableError::Cancelled) => {
                tracing::debug!("overview load cancelled");
                LoadState::Cancelled
            }
            Err(e) => {
                tracing::warn!(error = %e, "overview load failed");
                LoadState::Failed {
                    message: LOAD_FAILED_MESSAGE.to_string(),
                }
            }
        }
    }

    /// Load the window ending today (UTC)
    pub async fn load_today(&self, cancel: &CancellationToken) -> LoadState {
        self.load(Utc::now().date_naive(), cancel).await
    }

    /// Start a load on the runtime.
    ///
    /// Dropping the returned handle cancels the load.
    pub fn spawn(&self, last_day: NaiveDate) -> LoadHandle {
        let token = CancellationToken::new();
        let loader = self.clone();
        let task_token = token.clone();
        let join = tokio::spawn(async move { loader.load(last_day, &task_token).await });

        LoadHandle {
            token: token.clone(),
            guard: token.drop_guard(),
            join,
        }
    }
}

/// Handle to a spawned load; cancels it when dropped
pub struct LoadHandle {
    token: CancellationToken,
    guard: DropGuard,
    join: JoinHandle<LoadState>,
}

impl LoadHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the load to settle
    pub async fn wait(self) -> LoadState {
        let LoadHandle { guard, join, .. } = self;
        let state = match join.await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "overview task failed");
                LoadState::Failed {
                    message: LOAD_FAILED_MESSAGE.to_string(),
                }
            }
        };
        let _ = guard.disarm();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::types::AdapterStatus;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// HRV query fails; the others succeed
    struct FailingHrvAdapter;

    #[async_trait]
    impl WearableAdapter for FailingHrvAdapter {
        fn source(&self) -> SourceId {
            SourceId::Fitbit
        }

        async fn status(&self) -> Result<AdapterStatus> {
            Ok(AdapterStatus::Connected {
                source: SourceId::Fitbit,
            })
        }

        async fn sleep(&self, range: &TimeRange) -> Result<Vec<SleepSummary>> {
            MockAdapter.sleep(range).await
        }

        async fn hrv(&self, _range: &TimeRange) -> Result<Vec<HrvSummary>> {
            Err(WearableError::query(SourceId::Fitbit, "401 Unauthorized"))
        }

        async fn daily_activity(&self, range: &TimeRange) -> Result<Vec<DailyActivity>> {
            MockAdapter.daily_activity(range).await
        }

        async fn energy_signal(&self, range: &TimeRange) -> Result<Vec<EnergySignal>> {
            MockAdapter.energy_signal(range).await
        }
    }

    /// Sleep query never resolves; records whether it was dropped
    struct HangingAdapter {
        started: Arc<Notify>,
        dropped: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl WearableAdapter for HangingAdapter {
        fn source(&self) -> SourceId {
            SourceId::Whoop
        }

        async fn status(&self) -> Result<AdapterStatus> {
            Ok(AdapterStatus::Connecting)
        }

        async fn sleep(&self, _range: &TimeRange) -> Result<Vec<SleepSummary>> {
            let _flag = SetOnDrop(self.dropped.clone());
            self.started.notify_one();
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }

        async fn hrv(&self, range: &TimeRange) -> Result<Vec<HrvSummary>> {
            MockAdapter.hrv(range).await
        }

        async fn daily_activity(&self, range: &TimeRange) -> Result<Vec<DailyActivity>> {
            MockAdapter.daily_activity(range).await
        }

        async fn energy_signal(&self, range: &TimeRange) -> Result<Vec<EnergySignal>> {
            MockAdapter.energy_signal(range).await
        }
    }

    #[tokio::test]
    async fn test_snapshot_from_mock() {
        let range = TimeRange::trailing_days(day(2024, 1, 3), 3).unwrap();
        let snapshot = load_snapshot(&MockAdapter, &range, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.sleep.len(), 3);
        assert_eq!(snapshot.hrv.len(), 3);
        assert_eq!(snapshot.activity.len(), 3);
        assert_eq!(snapshot.energy.len(), 3);
        assert_eq!(snapshot.range, range);
    }

    #[tokio::test]
    async fn test_mock_week_report() {
        let provider = WearableProvider::with_mock().await;
        let loader = OverviewLoader::new(provider);

        let report = loader
            .fetch(day(2024, 1, 7), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.source, SourceId::Mock);
        assert_eq!(report.first_day, day(2024, 1, 1));
        assert_eq!(report.last_day, day(2024, 1, 7));

        // rmssd 48..63 then back to 48; trailing avg 55.5
        assert_eq!(report.hrv, HrvMetrics { hrv: Some(48.0), hrv_delta: -14 });
        // rhr trailing avg 59.5, latest 62
        assert_eq!(
            report.resting_hr,
            RestingHrMetrics {
                resting_hr: Some(62.0),
                resting_hr_delta: 3
            }
        );
        assert_eq!(report.sleep.duration_minutes, Some(420));
        assert_eq!(report.sleep.duration_delta_minutes, -15);
        assert_eq!(
            report.energy,
            EnergyMetrics {
                body_battery: Some(75),
                body_battery_delta: 18
            }
        );
        assert_eq!(
            report.activity,
            ActivityMetrics {
                steps: Some(8700),
                steps_delta_pct: 22,
                active_minutes_total: 280,
            }
        );
    }

    #[tokio::test]
    async fn test_single_query_failure_fails_batch() {
        let provider = WearableProvider::initialize(Arc::new(FailingHrvAdapter)).await;
        let loader = OverviewLoader::new(provider);
        let token = CancellationToken::new();

        assert!(matches!(
            loader.fetch(day(2024, 1, 7), &token).await,
            Err(WearableError::Query { .. })
        ));
        assert_eq!(
            loader.load(day(2024, 1, 7), &token).await,
            LoadState::Failed {
                message: LOAD_FAILED_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_drops_in_flight_queries() {
        let started = Arc::new(Notify::new());
        let dropped = Arc::new(AtomicBool::new(false));
        let provider = WearableProvider::new(Arc::new(HangingAdapter {
            started: started.clone(),
            dropped: dropped.clone(),
        }));
        let loader = OverviewLoader::new(provider);

        let handle = loader.spawn(day(2024, 1, 7));
        started.notified().await;
        handle.cancel();

        assert_eq!(handle.wait().await, LoadState::Cancelled);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();

        let range = TimeRange::trailing_days(day(2024, 1, 7), 7).unwrap();
        let result = load_snapshot(&MockAdapter, &range, &token).await;
        assert!(matches!(result, Err(WearableError::Cancelled)));
    }

    #[tokio::test]
    async fn test_spawned_load_completes() {
        let loader = OverviewLoader::with_window(WearableProvider::with_mock().await, 3);
        assert_eq!(loader.window_days(), 3);

        let state = loader.spawn(day(2024, 5, 1)).wait().await;
        match state {
            LoadState::Loaded(report) => assert_eq!(report.first_day, day(2024, 4, 29)),
            other => panic!("expected loaded state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_day_window_fails() {
        let loader = OverviewLoader::with_window(WearableProvider::with_mock().await, 0);
        let state = loader.load(day(2024, 1, 7), &CancellationToken::new()).await;
        assert!(!state.is_loaded());
    }

    #[tokio::test]
    async fn test_report_serializes_camel_case() {
        let loader = OverviewLoader::new(WearableProvider::with_mock().await);
        let report = loader
            .fetch(day(2024, 1, 7), &CancellationToken::new())
            .await
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["hrv"]["hrvDelta"], -14);
        assert_eq!(json["restingHr"]["restingHrDelta"], 3);
        assert_eq!(json["source"], "mock");
        assert_eq!(json["firstDay"], "2024-01-01");
    }
}
