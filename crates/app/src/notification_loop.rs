//! Notification loop — polls devices, diffs snapshots, pushes deltas.
//!
//! The cycle is `sleep → poll all devices → diff → push if nonempty`,
//! repeated until the process is torn down. Previous snapshots are kept in a
//! map keyed by device id and advance on every successful poll — a failed
//! push loses only that window's delta, never a poll-to-push window.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use homelink_domain::capability::{StateRecord, StateValue};
use homelink_domain::device::DeviceReport;
use homelink_domain::id::DeviceId;

use crate::ports::ChangeNotifier;
use crate::registry::DeviceRegistry;

/// Fixed cycle interval, chosen to respect the upstream endpoint's rate
/// expectations; deliberately not reduced under load.
pub const NOTIFY_INTERVAL: Duration = Duration::from_secs(10);

/// Last observed values of one device, keyed by `(type, instance)`.
type Snapshot = BTreeMap<(String, String), StateValue>;

/// Periodic state-diff pusher.
pub struct NotificationLoop<N> {
    registry: Arc<DeviceRegistry>,
    notifier: N,
    interval: Duration,
    previous: HashMap<DeviceId, Snapshot>,
}

impl<N: ChangeNotifier> NotificationLoop<N> {
    /// Create a loop over the registry with the default interval.
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>, notifier: N) -> Self {
        Self {
            registry,
            notifier,
            interval: NOTIFY_INTERVAL,
            previous: HashMap::new(),
        }
    }

    /// Override the cycle interval (tests and local setups).
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run cycles forever. Spawn this onto the runtime; it only ends with
    /// the process.
    pub async fn run(mut self) {
        loop {
            tokio::time::sleep(self.interval).await;
            self.cycle().await;
        }
    }

    /// One poll → diff → push cycle.
    ///
    /// Polling one device is isolated: a query fault is logged, the device
    /// is skipped for this cycle, and its previous snapshot stays stale
    /// until it polls clean again. The push itself is best-effort — a
    /// rejected or unreachable endpoint is logged and swallowed.
    pub async fn cycle(&mut self) {
        let registry = Arc::clone(&self.registry);
        let mut deltas = Vec::new();

        for device in registry.iter() {
            match device.report() {
                Ok(report) => {
                    let snapshot = snapshot_of(&report);
                    let delta = changed_since(&report, self.previous.get(device.id()));
                    if !delta.is_empty() {
                        deltas.push(delta);
                    }
                    self.previous.insert(device.id().clone(), snapshot);
                }
                Err(err) => {
                    tracing::warn!(device = %device.id(), error = %err, "device poll failed, skipping this cycle");
                }
            }
        }

        if deltas.is_empty() {
            return;
        }

        tracing::debug!(devices = deltas.len(), "pushing state delta");
        if let Err(err) = self.notifier.notify_state(deltas).await {
            tracing::warn!(error = %err, "state push failed");
        }
    }
}

fn snapshot_of(report: &DeviceReport) -> Snapshot {
    report
        .capabilities
        .iter()
        .chain(report.properties.iter())
        .map(|record| {
            (
                (record.type_id.clone(), record.state.instance.clone()),
                record.state.value.clone(),
            )
        })
        .collect()
}

fn changed_since(report: &DeviceReport, previous: Option<&Snapshot>) -> DeviceReport {
    let changed = |record: &StateRecord| {
        previous
            .and_then(|snapshot| {
                snapshot.get(&(record.type_id.clone(), record.state.instance.clone()))
            })
            != Some(&record.state.value)
    };
    DeviceReport {
        id: report.id.clone(),
        capabilities: report.capabilities.iter().filter(|r| changed(r)).cloned().collect(),
        properties: report.properties.iter().filter(|r| changed(r)).cloned().collect(),
    }
}
