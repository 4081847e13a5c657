//! Wearable data adapters
//!
//! An adapter is the boundary between the pipeline and one data source. Every
//! adapter answers the same four range queries; adapters that need a session
//! with their source additionally expose a [`SessionCapability`].
//!
//! Query contract shared by all adapters:
//! - results are ordered by ascending `date`
//! - at most one record per calendar day per record type
//! - a range without data yields an empty vec, never an error
//! - transport or auth failures surface as `Err` and are not retried

mod garmin;
mod mock;

pub use garmin::GarminExportAdapter;
pub use mock::MockAdapter;

use crate::error::Result;
use crate::range::TimeRange;
use crate::types::{AdapterStatus, DailyActivity, EnergySignal, HrvSummary, SleepSummary, SourceId};
use async_trait::async_trait;

/// Uniform query surface for a wearable data source
#[async_trait]
pub trait WearableAdapter: Send + Sync {
    /// Source identifier stamped on every record this adapter produces
    fn source(&self) -> SourceId;

    /// Current connectivity.
    ///
    /// Expected failures are reported as [`AdapterStatus::Error`]; `Err` is
    /// reserved for faults the adapter could not classify.
    async fn status(&self) -> Result<AdapterStatus>;

    async fn sleep(&self, range: &TimeRange) -> Result<Vec<SleepSummary>>;

    async fn hrv(&self, range: &TimeRange) -> Result<Vec<HrvSummary>>;

    async fn daily_activity(&self, range: &TimeRange) -> Result<Vec<DailyActivity>>;

    async fn energy_signal(&self, range: &TimeRange) -> Result<Vec<EnergySignal>>;

    /// Session management, if this source needs one
    fn session(&self) -> Option<&dyn SessionCapability> {
        None
    }
}

/// Optional session lifecycle for sources that require connect/disconnect
#[async_trait]
pub trait SessionCapability: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}
