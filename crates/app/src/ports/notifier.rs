//! Change notifier port — push-style callbacks to the assistant platform.

use std::future::Future;
use std::sync::Arc;

use homelink_domain::device::DeviceReport;
use homelink_domain::error::NotifyError;

/// Delivers out-of-band notifications to the assistant's callback endpoint.
///
/// Both calls are best-effort from the engine's point of view: the
/// notification loop logs failures and carries on, and there is no retry
/// queue.
pub trait ChangeNotifier: Send + Sync {
    /// Push changed-only device state records.
    fn notify_state(
        &self,
        devices: Vec<DeviceReport>,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;

    /// Tell the platform the device/capability set itself changed and a
    /// re-discovery is in order.
    fn notify_discovery(&self) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

impl<T: ChangeNotifier> ChangeNotifier for Arc<T> {
    fn notify_state(
        &self,
        devices: Vec<DeviceReport>,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        (**self).notify_state(devices)
    }

    fn notify_discovery(&self) -> impl Future<Output = Result<(), NotifyError>> + Send {
        (**self).notify_discovery()
    }
}
