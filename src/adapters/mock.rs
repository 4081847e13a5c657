//! Deterministic mock adapter
//!
//! Synthesizes one record per calendar day in the requested range. Values are
//! derived only from the day's index within the range, so the same range always
//! produces identical output.

use crate::error::Result;
use crate::range::TimeRange;
use crate::types::{
    AdapterStatus, DailyActivity, EnergySignal, HrvSummary, SleepStages, SleepSummary, SourceId,
};
use async_trait::async_trait;
use chrono::Duration;

use super::WearableAdapter;

/// Base sleep duration before the 3-night cycle (minutes)
const BASE_SLEEP_MINUTES: u32 = 420;
/// Base RMSSD before the 6-day cycle (ms)
const BASE_RMSSD_MS: f64 = 48.0;
/// Base resting heart rate (bpm)
const BASE_RESTING_HR: f64 = 62.0;
const BASE_STEPS: u32 = 6000;
const BASE_ACTIVE_MINUTES: u32 = 25;
const BASE_BODY_BATTERY: u8 = 45;

/// Synthetic data source for development and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct MockAdapter;

impl MockAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WearableAdapter for MockAdapter {
    fn source(&self) -> SourceId {
        SourceId::Mock
    }

    async fn status(&self) -> Result<AdapterStatus> {
        Ok(AdapterStatus::Connected {
            source: SourceId::Mock,
        })
    }

    async fn sleep(&self, range: &TimeRange) -> Result<Vec<SleepSummary>> {
        let records = range
            .days()
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                let cycle = (i % 3) as u32;
                let duration = BASE_SLEEP_MINUTES + 15 * cycle;
                let deep = duration * 20 / 100;
                let rem = duration * 22 / 100;
                let awake = duration * 5 / 100;
                let light = duration - deep - rem - awake;

                // bedtime 23:00 the evening before; no window on the first calendar day
                let start = date
                    .pred_opt()
                    .and_then(|eve| eve.and_hms_opt(23, 0, 0))
                    .map(|bed| bed.and_utc());
                let end = start
                    .and_then(|s| s.checked_add_signed(Duration::minutes(i64::from(duration))));

                SleepSummary {
                    date,
                    duration_minutes: duration,
                    start_time: start,
                    end_time: end,
                    efficiency_pct: Some(85.0 + 3.0 * f64::from(cycle)),
                    stages: Some(SleepStages {
                        deep_minutes: deep,
                        rem_minutes: rem,
                        light_minutes: light,
                        awake_minutes: awake,
                    }),
                    source: SourceId::Mock,
                }
            })
            .collect();

        tracing::debug!(days = range.day_count(), "mock sleep query");
        Ok(records)
    }

    async fn hrv(&self, range: &TimeRange) -> Result<Vec<HrvSummary>> {
        let records = range
            .days()
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                let cycle = (i % 6) as f64;
                let rmssd = BASE_RMSSD_MS + 3.0 * cycle;
                HrvSummary {
                    date,
                    rmssd_ms: Some(rmssd),
                    sdnn_ms: Some(rmssd + 12.0),
                    avg_resting_hr_bpm: Some(BASE_RESTING_HR - cycle),
                    source: SourceId::Mock,
                }
            })
            .collect();

        tracing::debug!(days = range.day_count(), "mock hrv query");
        Ok(records)
    }

    async fn daily_activity(&self, range: &TimeRange) -> Result<Vec<DailyActivity>> {
        let records = range
            .days()
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                let i = i as u32;
                DailyActivity {
                    date,
                    steps: Some(BASE_STEPS + 450 * i),
                    active_minutes: Some(BASE_ACTIVE_MINUTES + 5 * i),
                    source: SourceId::Mock,
                }
            })
            .collect();

        tracing::debug!(days = range.day_count(), "mock activity query");
        Ok(records)
    }

    async fn energy_signal(&self, range: &TimeRange) -> Result<Vec<EnergySignal>> {
        let records = range
            .days()
            .into_iter()
            .enumerate()
            .map(|(i, date)| EnergySignal {
                date,
                body_battery_level: Some(BASE_BODY_BATTERY + 5 * (i % 10) as u8),
                source: SourceId::Mock,
            })
            .collect();

        tracing::debug!(days = range.day_count(), "mock energy query");
        Ok(records)
    }
}
