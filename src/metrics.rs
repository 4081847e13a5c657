//! Derived metrics
//!
//! Pure calculators that reduce a window of daily records into display values:
//! the most recent day's reading plus its trend against the trailing average.
//!
//! The trailing average covers every record except the last one. Missing
//! readings count as zero in the sum and the divisor is always `len - 1`, so
//! gaps earlier in the window pull the average down. Consumers already depend
//! on these exact numbers.

use crate::types::{DailyActivity, EnergySignal, HrvSummary, SleepSummary};
use serde::{Deserialize, Serialize};

/// Latest HRV and its percentage change against the trailing average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvMetrics {
    pub hrv: Option<f64>,
    pub hrv_delta: i64,
}

/// Latest resting heart rate and its bpm change against the trailing average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestingHrMetrics {
    pub resting_hr: Option<f64>,
    pub resting_hr_delta: i64,
}

/// Last night's sleep with its minute change against the trailing average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepMetrics {
    pub duration_minutes: Option<u32>,
    pub duration_delta_minutes: i64,
    pub efficiency_pct: Option<f64>,
}

/// Latest body battery and its point change against the trailing average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyMetrics {
    pub body_battery: Option<u8>,
    pub body_battery_delta: i64,
}

/// Latest step count, its percentage trend and active minutes over the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetrics {
    pub steps: Option<u32>,
    pub steps_delta_pct: i64,
    pub active_minutes_total: u32,
}

/// Latest value and trailing average, when a trend can be computed.
///
/// Returns `None` with fewer than two records, a missing latest value, or a
/// non-positive average.
fn trailing_trend<T>(records: &[T], field: impl Fn(&T) -> Option<f64>) -> Option<(f64, f64)> {
    let (last, previous) = records.split_last()?;
    if previous.is_empty() {
        return None;
    }

    let sum: f64 = previous.iter().map(|r| field(r).unwrap_or(0.0)).sum();
    let avg = sum / previous.len() as f64;
    let latest = field(last)?;

    if avg <= 0.0 {
        return None;
    }
    Some((latest, avg))
}

fn percent_delta((latest, avg): (f64, f64)) -> i64 {
    (((latest - avg) / avg) * 100.0).round() as i64
}

fn absolute_delta((latest, avg): (f64, f64)) -> i64 {
    (latest - avg).round() as i64
}

/// HRV (RMSSD) for the most recent day and its percentage trend
pub fn calculate_hrv_metrics(records: &[HrvSummary]) -> HrvMetrics {
    HrvMetrics {
        hrv: records.last().and_then(|r| r.rmssd_ms),
        hrv_delta: trailing_trend(records, |r| r.rmssd_ms)
            .map(percent_delta)
            .unwrap_or(0),
    }
}

/// Resting heart rate for the most recent day and its absolute trend in bpm
pub fn calculate_resting_hr_metrics(records: &[HrvSummary]) -> RestingHrMetrics {
    RestingHrMetrics {
        resting_hr: records.last().and_then(|r| r.avg_resting_hr_bpm),
        resting_hr_delta: trailing_trend(records, |r| r.avg_resting_hr_bpm)
            .map(absolute_delta)
            .unwrap_or(0),
    }
}

pub fn calculate_sleep_metrics(records: &[SleepSummary]) -> SleepMetrics {
    let last = records.last();
    SleepMetrics {
        duration_minutes: last.map(|r| r.duration_minutes),
        duration_delta_minutes: trailing_trend(records, |r| Some(f64::from(r.duration_minutes)))
            .map(absolute_delta)
            .unwrap_or(0),
        efficiency_pct: last.and_then(|r| r.efficiency_pct),
    }
}

pub fn calculate_energy_metrics(records: &[EnergySignal]) -> EnergyMetrics {
    EnergyMetrics {
        body_battery: records.last().and_then(|r| r.body_battery_level),
        body_battery_delta: trailing_trend(records, |r| r.body_battery_level.map(f64::from))
            .map(absolute_delta)
            .unwrap_or(0),
    }
}

pub fn calculate_activity_metrics(records: &[DailyActivity]) -> ActivityMetrics {
    ActivityMetrics {
        steps: records.last().and_then(|r| r.steps),
        steps_delta_pct: trailing_trend(records, |r| r.steps.map(f64::from))
            .map(percent_delta)
            .unwrap_or(0),
        active_minutes_total: records.iter().filter_map(|r| r.active_minutes).sum(),
    }
}
