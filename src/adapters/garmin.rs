//! Garmin export adapter
//!
//! Serves range queries from a Garmin Connect JSON export. Garmin exports can
//! carry several entries for one calendar date (re-syncs, intraday snapshots);
//! those are merged so each query returns at most one record per day.

use crate::error::{Result, WearableError};
use crate::range::TimeRange;
use crate::types::{
    AdapterStatus, DailyActivity, EnergySignal, HrvSummary, SleepStages, SleepSummary, SourceId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{SessionCapability, WearableAdapter};

/// Adapter backed by a parsed Garmin Connect export
#[derive(Debug)]
pub struct GarminExportAdapter {
    days: BTreeMap<NaiveDate, DayData>,
    connected: AtomicBool,
}

/// Merged Garmin data for one calendar date
#[derive(Debug, Default)]
struct DayData {
    daily: Option<GarminDaily>,
    sleep: Option<GarminSleep>,
    hrv: Option<GarminHrv>,
}

impl GarminExportAdapter {
    /// Parse an export from a JSON string
    pub fn from_json(raw_json: &str) -> Result<Self> {
        let payload: GarminPayload = serde_json::from_str(raw_json)?;
        let mut days: BTreeMap<NaiveDate, DayData> = BTreeMap::new();

        for daily in payload.dailies.unwrap_or_default() {
            let entry = days.entry(parse_date(&daily.calendar_date)?).or_default();
            entry.daily = Some(match entry.daily.take() {
                Some(existing) => existing.merge(daily),
                None => daily,
            });
        }

        for sleep in payload.sleep.unwrap_or_default() {
            let entry = days.entry(parse_date(&sleep.calendar_date)?).or_default();
            entry.sleep = Some(match entry.sleep.take() {
                Some(existing) => existing.merge(sleep),
                None => sleep,
            });
        }

        for hrv in payload.hrv.unwrap_or_default() {
            let entry = days.entry(parse_date(&hrv.calendar_date)?).or_default();
            entry.hrv = Some(match entry.hrv.take() {
                Some(existing) => existing.merge(hrv),
                None => hrv,
            });
        }

        tracing::debug!(days = days.len(), "parsed garmin export");

        Ok(Self {
            days,
            connected: AtomicBool::new(false),
        })
    }

    /// Read and parse an export file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let adapter = Self::from_json(&contents)?;
        tracing::info!("Loaded Garmin export from {:?}", path);
        Ok(adapter)
    }

    /// Number of calendar days present in the export
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(WearableError::NotConnected(SourceId::Garmin))
        }
    }

    fn days_in<'a>(
        &'a self,
        range: &TimeRange,
    ) -> impl Iterator<Item = (&'a NaiveDate, &'a DayData)> + 'a {
        self.days.range(range.first_day()..=range.last_day())
    }
}

#[async_trait]
impl WearableAdapter for GarminExportAdapter {
    fn source(&self) -> SourceId {
        SourceId::Garmin
    }

    async fn status(&self) -> Result<AdapterStatus> {
        if self.connected.load(Ordering::Acquire) {
            Ok(AdapterStatus::Connected {
                source: SourceId::Garmin,
            })
        } else {
            Ok(AdapterStatus::Disconnected)
        }
    }

    async fn sleep(&self, range: &TimeRange) -> Result<Vec<SleepSummary>> {
        self.ensure_connected()?;
        Ok(self
            .days_in(range)
            .filter_map(|(date, day)| day.sleep.as_ref().and_then(|s| convert_sleep(*date, s)))
            .collect())
    }

    async fn hrv(&self, range: &TimeRange) -> Result<Vec<HrvSummary>> {
        self.ensure_connected()?;
        Ok(self
            .days_in(range)
            .filter_map(|(date, day)| convert_hrv(*date, day))
            .collect())
    }

    async fn daily_activity(&self, range: &TimeRange) -> Result<Vec<DailyActivity>> {
        self.ensure_connected()?;
        Ok(self
            .days_in(range)
            .filter_map(|(date, day)| day.daily.as_ref().map(|d| convert_activity(*date, d)))
            .collect())
    }

    async fn energy_signal(&self, range: &TimeRange) -> Result<Vec<EnergySignal>> {
        self.ensure_connected()?;
        Ok(self
            .days_in(range)
            .filter_map(|(date, day)| day.daily.as_ref().and_then(|d| convert_energy(*date, d)))
            .collect())
    }

    fn session(&self) -> Option<&dyn SessionCapability> {
        Some(self)
    }
}

#[async_trait]
impl SessionCapability for GarminExportAdapter {
    async fn connect(&self) -> Result<()> {
        if self.days.is_empty() {
            return Err(WearableError::Session(
                "Garmin export contains no calendar days".to_string(),
            ));
        }
        self.connected.store(true, Ordering::Release);
        tracing::info!(days = self.days.len(), "garmin export connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        tracing::info!("garmin export disconnected");
        Ok(())
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| WearableError::Parse(format!("invalid calendarDate {:?}: {}", raw, e)))
}

fn millis_to_utc(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(|ts| Utc.timestamp_millis_opt(ts).single())
}

fn seconds_to_minutes(secs: Option<i64>) -> u32 {
    secs.map(|s| (s.max(0) / 60) as u32).unwrap_or(0)
}

fn convert_sleep(date: NaiveDate, s: &GarminSleep) -> Option<SleepSummary> {
    let sleep_seconds = s.sleep_time_seconds?;
    let duration_minutes = (sleep_seconds.max(0) / 60) as u32;
    let start_time = millis_to_utc(s.sleep_start_timestamp_gmt);
    let end_time = millis_to_utc(s.sleep_end_timestamp_gmt);

    // Efficiency against time in bed, when the window is known
    let in_bed_seconds = match (start_time, end_time) {
        (Some(start), Some(end)) => (end - start).num_seconds(),
        _ => 0,
    };
    let efficiency_pct = (in_bed_seconds > 0).then(|| {
        (sleep_seconds.max(0) as f64 / in_bed_seconds as f64 * 100.0).clamp(0.0, 100.0)
    });

    let has_stages = s.deep_sleep_seconds.is_some()
        || s.rem_sleep_seconds.is_some()
        || s.light_sleep_seconds.is_some()
        || s.awake_sleep_seconds.is_some();
    let stages = has_stages.then(|| SleepStages {
        deep_minutes: seconds_to_minutes(s.deep_sleep_seconds),
        rem_minutes: seconds_to_minutes(s.rem_sleep_seconds),
        light_minutes: seconds_to_minutes(s.light_sleep_seconds),
        awake_minutes: seconds_to_minutes(s.awake_sleep_seconds),
    });

    Some(SleepSummary {
        date,
        duration_minutes,
        start_time,
        end_time,
        efficiency_pct,
        stages,
        source: SourceId::Garmin,
    })
}

fn convert_hrv(date: NaiveDate, day: &DayData) -> Option<HrvSummary> {
    let rmssd_ms = day
        .hrv
        .as_ref()
        .and_then(|h| h.last_night_avg)
        .or_else(|| day.daily.as_ref().and_then(|d| d.resting_heart_rate_hrv));
    let sdnn_ms = day.hrv.as_ref().and_then(|h| h.sdnn);
    let avg_resting_hr_bpm = day
        .daily
        .as_ref()
        .and_then(|d| d.resting_heart_rate)
        .map(f64::from);

    if rmssd_ms.is_none() && sdnn_ms.is_none() && avg_resting_hr_bpm.is_none() {
        return None;
    }

    Some(HrvSummary {
        date,
        rmssd_ms,
        sdnn_ms,
        avg_resting_hr_bpm,
        source: SourceId::Garmin,
    })
}

fn convert_activity(date: NaiveDate, d: &GarminDaily) -> DailyActivity {
    let active_minutes = match (d.moderate_intensity_minutes, d.vigorous_intensity_minutes) {
        (None, None) => None,
        (moderate, vigorous) => Some(moderate.unwrap_or(0) + vigorous.unwrap_or(0)),
    };

    DailyActivity {
        date,
        steps: d.total_steps,
        active_minutes,
        source: SourceId::Garmin,
    }
}

fn convert_energy(date: NaiveDate, d: &GarminDaily) -> Option<EnergySignal> {
    let level = d
        .body_battery_most_recent_value
        .or(d.body_battery_highest_value)?;

    Some(EnergySignal {
        date,
        body_battery_level: Some(level.clamp(0, 100) as u8),
        source: SourceId::Garmin,
    })
}

// Garmin export structures

#[derive(Debug, Deserialize)]
struct GarminPayload {
    dailies: Option<Vec<GarminDaily>>,
    sleep: Option<Vec<GarminSleep>>,
    hrv: Option<Vec<GarminHrv>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminDaily {
    calendar_date: String,
    total_steps: Option<u32>,
    resting_heart_rate: Option<i32>,
    resting_heart_rate_hrv: Option<f64>,
    body_battery_most_recent_value: Option<i32>,
    body_battery_highest_value: Option<i32>,
    moderate_intensity_minutes: Option<u32>,
    vigorous_intensity_minutes: Option<u32>,
}

impl GarminDaily {
    /// Later entry wins for every field it carries
    fn merge(self, later: GarminDaily) -> GarminDaily {
        GarminDaily {
            calendar_date: later.calendar_date,
            total_steps: later.total_steps.or(self.total_steps),
            resting_heart_rate: later.resting_heart_rate.or(self.resting_heart_rate),
            resting_heart_rate_hrv: later.resting_heart_rate_hrv.or(self.resting_heart_rate_hrv),
            body_battery_most_recent_value: later
                .body_battery_most_recent_value
                .or(self.body_battery_most_recent_value),
            body_battery_highest_value: later
                .body_battery_highest_value
                .or(self.body_battery_highest_value),
            moderate_intensity_minutes: later
                .moderate_intensity_minutes
                .or(self.moderate_intensity_minutes),
            vigorous_intensity_minutes: later
                .vigorous_intensity_minutes
                .or(self.vigorous_intensity_minutes),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminSleep {
    calendar_date: String,
    sleep_start_timestamp_gmt: Option<i64>,
    sleep_end_timestamp_gmt: Option<i64>,
    sleep_time_seconds: Option<i64>,
    awake_sleep_seconds: Option<i64>,
    light_sleep_seconds: Option<i64>,
    deep_sleep_seconds: Option<i64>,
    rem_sleep_seconds: Option<i64>,
}

impl GarminSleep {
    fn merge(self, later: GarminSleep) -> GarminSleep {
        GarminSleep {
            calendar_date: later.calendar_date,
            sleep_start_timestamp_gmt: later
                .sleep_start_timestamp_gmt
                .or(self.sleep_start_timestamp_gmt),
            sleep_end_timestamp_gmt: later
                .sleep_end_timestamp_gmt
                .or(self.sleep_end_timestamp_gmt),
            sleep_time_seconds: later.sleep_time_seconds.or(self.sleep_time_seconds),
            awake_sleep_seconds: later.awake_sleep_seconds.or(self.awake_sleep_seconds),
            light_sleep_seconds: later.light_sleep_seconds.or(self.light_sleep_seconds),
            deep_sleep_seconds: later.deep_sleep_seconds.or(self.deep_sleep_seconds),
            rem_sleep_seconds: later.rem_sleep_seconds.or(self.rem_sleep_seconds),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminHrv {
    calendar_date: String,
    last_night_avg: Option<f64>,
    sdnn: Option<f64>,
}

impl GarminHrv {
    fn merge(self, later: GarminHrv) -> GarminHrv {
        GarminHrv {
            calendar_date: later.calendar_date,
            last_night_avg: later.last_night_avg.or(self.last_night_avg),
            sdnn: later.sdnn.or(self.sdnn),
        }
    }
}
