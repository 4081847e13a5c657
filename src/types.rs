//! Core record types for the wearable metrics pipeline
//!
//! Every record describes one calendar day for one data source and is produced
//! fresh by an adapter query. Field names serialize in camelCase so payloads
//! line up with the JSON the host app already consumes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data provenance for every record and connected status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Mock,
    Garmin,
    Fitbit,
    AppleHealth,
    HealthConnect,
    Whoop,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Mock => "mock",
            SourceId::Garmin => "garmin",
            SourceId::Fitbit => "fitbit",
            SourceId::AppleHealth => "apple_health",
            SourceId::HealthConnect => "health_connect",
            SourceId::Whoop => "whoop",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sleep stage breakdown in minutes.
///
/// Stages are reported as the vendor gives them; they are not required to sum
/// to the night's total duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepStages {
    pub deep_minutes: u32,
    pub rem_minutes: u32,
    pub light_minutes: u32,
    pub awake_minutes: u32,
}

/// One calendar night of sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSummary {
    /// Calendar day key (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Total sleep duration
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Sleep efficiency (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<SleepStages>,
    pub source: SourceId,
}

/// One calendar day of heart-rate-variability data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrvSummary {
    pub date: NaiveDate,
    /// Root mean square of successive differences (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmssd_ms: Option<f64>,
    /// Standard deviation of NN intervals (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdnn_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_resting_hr_bpm: Option<f64>,
    pub source: SourceId,
}

/// One calendar day of movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_minutes: Option<u32>,
    pub source: SourceId,
}

/// One calendar day of composite energy ("body battery")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySignal {
    pub date: NaiveDate,
    /// Body battery level (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_battery_level: Option<u8>,
    pub source: SourceId,
}

/// Connectivity of the active adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AdapterStatus {
    Disconnected,
    Connecting,
    Connected { source: SourceId },
    Error { message: String },
}

impl AdapterStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, AdapterStatus::Connected { .. })
    }

    /// Short label for connectivity indicators
    pub fn label(&self) -> String {
        match self {
            AdapterStatus::Disconnected => "Disconnected".to_string(),
            AdapterStatus::Connecting => "Connecting".to_string(),
            AdapterStatus::Connected { source } => format!("Connected ({})", source),
            AdapterStatus::Error { message } => format!("Error: {}", message),
        }
    }
}

impl Default for AdapterStatus {
    fn default() -> Self {
        AdapterStatus::Disconnected
    }
}
