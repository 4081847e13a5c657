//! Wearable Metrics - data adapters and derived recovery metrics for wellness apps
//!
//! The pipeline turns wearable data into display-ready metrics:
//! adapter range queries → joined window snapshot → trend calculators → overview report.
//!
//! ## Modules
//!
//! - **Adapters**: one async query surface per data source (mock, Garmin export)
//! - **Provider**: the single active adapter and its broadcast connection status
//! - **Metrics**: latest-value and trailing-average trend calculators
//! - **Overview**: shared fan-out/fan-in loader with cancellation

pub mod adapters;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod overview;
pub mod provider;
pub mod range;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use adapters::{GarminExportAdapter, MockAdapter, SessionCapability, WearableAdapter};
pub use config::Config;
pub use error::{Result, WearableError};
pub use metrics::{calculate_hrv_metrics, calculate_resting_hr_metrics, HrvMetrics, RestingHrMetrics};
pub use overview::{load_snapshot, LoadState, OverviewLoader, OverviewReport, WearableSnapshot};
pub use provider::WearableProvider;
pub use range::TimeRange;
pub use types::{AdapterStatus, DailyActivity, EnergySignal, HrvSummary, SleepSummary, SourceId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI and FFI
pub const PRODUCER_NAME: &str = "wearable-metrics";
