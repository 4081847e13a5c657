//! Active adapter holder
//!
//! `WearableProvider` owns the single active adapter for an app session and the
//! last status it reported. It is a cheap-to-clone handle meant to be passed to
//! every consumer; status changes are broadcast through a `watch` channel.

use crate::adapters::{MockAdapter, WearableAdapter};
use crate::error::Result;
use crate::types::AdapterStatus;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// Message stored when an adapter's status call fails outright
pub const STATUS_CHECK_FAILED: &str = "Failed to fetch wearable status";

/// Shared handle to the active wearable adapter and its status
#[derive(Clone)]
pub struct WearableProvider {
    inner: Arc<Inner>,
}

struct Inner {
    installed: RwLock<Installed>,
    status_tx: watch::Sender<AdapterStatus>,
}

struct Installed {
    adapter: Arc<dyn WearableAdapter>,
    /// Bumped on every swap; status results from older adapters are dropped
    generation: u64,
}

impl WearableProvider {
    /// Create a provider in the `Disconnected` state without querying the adapter
    pub fn new(adapter: Arc<dyn WearableAdapter>) -> Self {
        let (status_tx, _) = watch::channel(AdapterStatus::Disconnected);
        Self {
            inner: Arc::new(Inner {
                installed: RwLock::new(Installed {
                    adapter,
                    generation: 0,
                }),
                status_tx,
            }),
        }
    }

    /// Create a provider and fetch the adapter's initial status
    pub async fn initialize(adapter: Arc<dyn WearableAdapter>) -> Self {
        let provider = Self::new(adapter);
        provider.refresh_status().await;
        provider
    }

    /// Provider backed by the mock adapter, as installed at app start
    pub async fn with_mock() -> Self {
        Self::initialize(Arc::new(MockAdapter::new())).await
    }

    /// The active adapter
    pub fn adapter(&self) -> Arc<dyn WearableAdapter> {
        self.read().adapter.clone()
    }

    /// Last settled status
    pub fn status(&self) -> AdapterStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<AdapterStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Swap the active adapter without touching status.
    ///
    /// Returns the new generation. Pending status refreshes against the
    /// previous adapter will no longer be published.
    pub fn replace_adapter(&self, adapter: Arc<dyn WearableAdapter>) -> u64 {
        let mut installed = self.write();
        installed.generation += 1;
        installed.adapter = adapter;
        tracing::info!(
            source = %installed.adapter.source(),
            generation = installed.generation,
            "wearable adapter replaced"
        );
        installed.generation
    }

    /// Swap the active adapter and refresh status against it.
    ///
    /// The swap is visible to other holders before the first await point.
    pub async fn set_adapter(&self, adapter: Arc<dyn WearableAdapter>) -> AdapterStatus {
        self.replace_adapter(adapter);
        self.refresh_status().await
    }

    /// Query the active adapter's status and publish it.
    ///
    /// An `Err` from the adapter is recorded as [`AdapterStatus::Error`] with
    /// [`STATUS_CHECK_FAILED`]. Returns the provider's status afterwards.
    pub async fn refresh_status(&self) -> AdapterStatus {
        let (adapter, generation) = self.current();

        let status = match adapter.status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(source = %adapter.source(), error = %e, "status check failed");
                AdapterStatus::Error {
                    message: STATUS_CHECK_FAILED.to_string(),
                }
            }
        };

        self.publish(generation, status);
        self.status()
    }

    /// Open a session on the active adapter if it supports one, then refresh
    pub async fn connect(&self) -> Result<()> {
        let (adapter, generation) = self.current();
        let Some(session) = adapter.session() else {
            self.refresh_status().await;
            return Ok(());
        };

        self.publish(generation, AdapterStatus::Connecting);
        match session.connect().await {
            Ok(()) => {
                self.refresh_status().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(source = %adapter.source(), error = %e, "connect failed");
                self.publish(
                    generation,
                    AdapterStatus::Error {
                        message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Close the active adapter's session if it has one, then refresh
    pub async fn disconnect(&self) -> Result<()> {
        let adapter = self.adapter();
        if let Some(session) = adapter.session() {
            session.disconnect().await?;
        }
        self.refresh_status().await;
        Ok(())
    }

    fn current(&self) -> (Arc<dyn WearableAdapter>, u64) {
        let installed = self.read();
        (installed.adapter.clone(), installed.generation)
    }

    fn publish(&self, generation: u64, status: AdapterStatus) {
        let installed = self.read();
        if installed.generation != generation {
            tracing::debug!(generation, "dropping status from replaced adapter");
            return;
        }

        self.inner.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::info!(from = %current.label(), to = %status.label(), "wearable status changed");
            *current = status;
            true
        });
    }

    fn read(&self) -> RwLockReadGuard<'_, Installed> {
        self.inner
            .installed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Installed> {
        self.inner
            .installed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for WearableProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let installed = self.read();
        f.debug_struct("WearableProvider")
            .field("source", &installed.adapter.source())
            .field("generation", &installed.generation)
            .field("status", &*self.inner.status_tx.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{GarminExportAdapter, SessionCapability};
    use crate::error::WearableError;
    use crate::range::TimeRange;
    use crate::types::{DailyActivity, EnergySignal, HrvSummary, SleepSummary, SourceId};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Adapter that counts status calls and can be told to fail them
    struct CountingAdapter {
        source: SourceId,
        fail_status: bool,
        status_calls: AtomicUsize,
    }

    impl CountingAdapter {
        fn new(source: SourceId) -> Arc<Self> {
            Arc::new(Self {
                source,
                fail_status: false,
                status_calls: AtomicUsize::new(0),
            })
        }

        fn failing(source: SourceId) -> Arc<Self> {
            Arc::new(Self {
                source,
                fail_status: true,
                status_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WearableAdapter for CountingAdapter {
        fn source(&self) -> SourceId {
            self.source
        }

        async fn status(&self) -> Result<AdapterStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_status {
                return Err(WearableError::query(self.source, "status endpoint down"));
            }
            Ok(AdapterStatus::Connected {
                source: self.source,
            })
        }

        async fn sleep(&self, _range: &TimeRange) -> Result<Vec<SleepSummary>> {
            Ok(Vec::new())
        }

        async fn hrv(&self, _range: &TimeRange) -> Result<Vec<HrvSummary>> {
            Ok(Vec::new())
        }

        async fn daily_activity(&self, _range: &TimeRange) -> Result<Vec<DailyActivity>> {
            Ok(Vec::new())
        }

        async fn energy_signal(&self, _range: &TimeRange) -> Result<Vec<EnergySignal>> {
            Ok(Vec::new())
        }
    }

    /// Adapter whose status call blocks until released
    struct GatedAdapter {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl WearableAdapter for GatedAdapter {
        fn source(&self) -> SourceId {
            SourceId::Whoop
        }

        async fn status(&self) -> Result<AdapterStatus> {
            self.gate.notified().await;
            Ok(AdapterStatus::Error {
                message: "late".to_string(),
            })
        }

        async fn sleep(&self, _range: &TimeRange) -> Result<Vec<SleepSummary>> {
            Ok(Vec::new())
        }

        async fn hrv(&self, _range: &TimeRange) -> Result<Vec<HrvSummary>> {
            Ok(Vec::new())
        }

        async fn daily_activity(&self, _range: &TimeRange) -> Result<Vec<DailyActivity>> {
            Ok(Vec::new())
        }

        async fn energy_signal(&self, _range: &TimeRange) -> Result<Vec<EnergySignal>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_new_provider_starts_disconnected() {
        let adapter = CountingAdapter::new(SourceId::Mock);
        let provider = WearableProvider::new(adapter.clone());

        assert_eq!(provider.status(), AdapterStatus::Disconnected);
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_initialize_fetches_status() {
        let provider = WearableProvider::with_mock().await;
        assert_eq!(
            provider.status(),
            AdapterStatus::Connected {
                source: SourceId::Mock
            }
        );
        assert_eq!(provider.adapter().source(), SourceId::Mock);
    }

    #[tokio::test]
    async fn test_status_failure_becomes_error_state() {
        let provider = WearableProvider::initialize(CountingAdapter::failing(SourceId::Fitbit)).await;
        assert_eq!(
            provider.status(),
            AdapterStatus::Error {
                message: STATUS_CHECK_FAILED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_replace_is_immediate_and_refresh_queries_once() {
        let provider = WearableProvider::with_mock().await;
        let fitbit = CountingAdapter::new(SourceId::Fitbit);

        provider.replace_adapter(fitbit.clone());
        assert_eq!(provider.adapter().source(), SourceId::Fitbit);
        assert_eq!(fitbit.calls(), 0);
        // previous status stays visible until the refresh settles
        assert_eq!(
            provider.status(),
            AdapterStatus::Connected {
                source: SourceId::Mock
            }
        );

        provider.refresh_status().await;
        assert_eq!(fitbit.calls(), 1);
        assert_eq!(
            provider.status(),
            AdapterStatus::Connected {
                source: SourceId::Fitbit
            }
        );
    }

    #[tokio::test]
    async fn test_set_adapter_triggers_one_status_call() {
        let provider = WearableProvider::with_mock().await;
        let health = CountingAdapter::new(SourceId::HealthConnect);

        let status = provider.set_adapter(health.clone()).await;
        assert_eq!(health.calls(), 1);
        assert_eq!(
            status,
            AdapterStatus::Connected {
                source: SourceId::HealthConnect
            }
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let provider = WearableProvider::new(Arc::new(MockAdapter::new()));
        let mut rx = provider.subscribe();

        provider.refresh_status().await;
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_connected());

        // unchanged status does not notify again
        provider.refresh_status().await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_stale_status_from_replaced_adapter_is_dropped() {
        let gate = Arc::new(Notify::new());
        let provider = WearableProvider::new(Arc::new(GatedAdapter { gate: gate.clone() }));

        let pending = provider.clone();
        let handle = tokio::spawn(async move { pending.refresh_status().await });
        tokio::task::yield_now().await;

        provider.set_adapter(Arc::new(MockAdapter::new())).await;
        gate.notify_one();
        handle.await.unwrap();

        assert_eq!(
            provider.status(),
            AdapterStatus::Connected {
                source: SourceId::Mock
            }
        );
    }

    #[tokio::test]
    async fn test_connect_without_session_only_refreshes() {
        let adapter = CountingAdapter::new(SourceId::AppleHealth);
        let provider = WearableProvider::new(adapter.clone());

        provider.connect().await.unwrap();
        assert_eq!(adapter.calls(), 1);
        assert!(provider.status().is_connected());

        provider.disconnect().await.unwrap();
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_session_adapter() {
        let export = r#"{"dailies":[{"calendarDate":"2024-01-15","totalSteps":100}]}"#;
        let garmin = Arc::new(GarminExportAdapter::from_json(export).unwrap());
        let provider = WearableProvider::initialize(garmin).await;
        assert_eq!(provider.status(), AdapterStatus::Disconnected);

        provider.connect().await.unwrap();
        assert_eq!(
            provider.status(),
            AdapterStatus::Connected {
                source: SourceId::Garmin
            }
        );

        provider.disconnect().await.unwrap();
        assert_eq!(provider.status(), AdapterStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_failure_sets_error() {
        let garmin = Arc::new(GarminExportAdapter::from_json("{}").unwrap());
        let provider = WearableProvider::new(garmin.clone());

        let result = provider.connect().await;
        assert!(result.is_err());
        assert!(matches!(provider.status(), AdapterStatus::Error { .. }));
        assert!(garmin.session().is_some());
        // session trait stays usable directly
        assert!(garmin.disconnect().await.is_ok());
    }
}
