//! On/off capability — the single `on` instance.

use serde::Serialize;

use crate::error::QueryError;
use crate::value::ValueCell;

use super::{
    CapabilityParameters, CapabilitySpecification, CapabilityType, ChangeFuture, ChangeHandler,
    ChangeOptions, ChangeRequest, StateRecord, invalid_value, unsupported,
};

/// Parameters block: `{split}`.
#[derive(Debug, Clone, Serialize)]
pub struct OnOffParameters {
    pub split: bool,
}

/// Boolean power switch.
///
/// `split(true)` tells the platform the on and off commands are physically
/// separate (e.g. a curtain motor driven up or down) and the reported value
/// cannot be trusted as a toggle state.
#[derive(Debug, Clone, Default)]
pub struct OnOff {
    value: ValueCell<bool>,
    retrievable: bool,
    reportable: bool,
    split: bool,
    on_change: Option<ChangeHandler<bool>>,
}

impl OnOff {
    /// The only instance name this kind exposes.
    pub const INSTANCE: &'static str = "on";

    /// Create a non-retrievable, non-reportable switch with no handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the observed value.
    #[must_use]
    pub fn with_initial(self, value: bool) -> Self {
        self.value.set(value);
        self
    }

    /// Mark the value as queryable.
    #[must_use]
    pub fn retrievable(mut self, retrievable: bool) -> Self {
        self.retrievable = retrievable;
        self
    }

    /// Mark value changes as push-notification eligible.
    #[must_use]
    pub fn reportable(mut self, reportable: bool) -> Self {
        self.reportable = reportable;
        self
    }

    /// Declare split on/off commands.
    #[must_use]
    pub fn split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    /// Install the change handler (late binding; see module docs).
    pub fn set_change_handler(&mut self, handler: ChangeHandler<bool>) {
        self.on_change = Some(handler);
    }

    #[must_use]
    pub fn is_retrievable(&self) -> bool {
        self.retrievable
    }

    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.reportable
    }

    /// Record a hardware-observed value. Clears any pending query fault.
    pub fn set(&self, value: bool) {
        self.value.set(value);
    }

    /// Raise a query fault on this facet.
    pub fn fail(&self, error: QueryError) {
        self.value.fail(error);
    }

    /// Current value for callers.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    ///
    /// # Panics
    ///
    /// Panics when the capability is not retrievable — reading such a value
    /// is a caller contract violation.
    pub fn value(&self) -> Result<Option<bool>, QueryError> {
        assert!(self.retrievable, "value() read on non-retrievable on_off capability");
        self.value.read()
    }

    pub(super) fn specification(&self) -> CapabilitySpecification {
        CapabilitySpecification {
            type_id: CapabilityType::OnOff,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: Some(CapabilityParameters::OnOff(OnOffParameters {
                split: self.split,
            })),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self
            .value
            .read()?
            .map(|on| StateRecord::capability(CapabilityType::OnOff, Self::INSTANCE, on.into())))
    }

    pub(super) fn dispatch(
        &self,
        instance: &str,
        value: &serde_json::Value,
        options: ChangeOptions,
    ) -> ChangeFuture {
        let Some(requested) = value.as_bool() else {
            return invalid_value(CapabilityType::OnOff, instance, "expected a boolean value");
        };
        match &self.on_change {
            Some(handler) => handler.invoke(ChangeRequest {
                instance: instance.to_string(),
                value: requested,
                options,
            }),
            None => unsupported(CapabilityType::OnOff, instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Applied;
    use crate::error::{ActionErrorCode, QueryErrorCode};
    use futures::FutureExt;

    #[test]
    fn should_start_with_unknown_value() {
        let cap = OnOff::new().retrievable(true);
        assert_eq!(cap.value().unwrap(), None);
        assert!(cap.current().unwrap().is_none());
    }

    #[test]
    fn should_expose_state_record_once_value_is_set() {
        let cap = OnOff::new().retrievable(true);
        cap.set(true);
        let record = cap.current().unwrap().unwrap();
        assert_eq!(record.state.instance, "on");
        assert_eq!(record.state.value, true.into());
    }

    #[test]
    fn should_share_value_between_clones() {
        let cap = OnOff::new().retrievable(true);
        let handle = cap.clone();
        handle.set(true);
        assert_eq!(cap.value().unwrap(), Some(true));
    }

    #[test]
    #[should_panic(expected = "non-retrievable")]
    fn should_panic_when_reading_non_retrievable_value() {
        let cap = OnOff::new();
        let _ = cap.value();
    }

    #[test]
    fn should_include_split_in_specification() {
        let spec = OnOff::new().split(true).specification();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "devices.capabilities.on_off",
                "retrievable": false,
                "reportable": false,
                "parameters": {"split": true},
            })
        );
    }

    #[tokio::test]
    async fn should_reject_change_without_handler() {
        let cap = OnOff::new();
        let err = cap
            .dispatch("on", &serde_json::json!(true), ChangeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ActionErrorCode::NotSupportedInCurrentMode);
    }

    #[tokio::test]
    async fn should_reject_non_boolean_value() {
        let cap = OnOff::new();
        let err = cap
            .dispatch("on", &serde_json::json!("yes"), ChangeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ActionErrorCode::InvalidValue);
    }

    #[tokio::test]
    async fn should_invoke_installed_handler() {
        let mut cap = OnOff::new();
        cap.set_change_handler(ChangeHandler::new(|req: ChangeRequest<bool>| {
            assert!(req.value);
            async { Ok(Applied::new(CapabilityType::OnOff, "on")) }.boxed()
        }));
        let applied = cap
            .dispatch("on", &serde_json::json!(true), ChangeOptions::default())
            .await
            .unwrap();
        assert_eq!(applied.instance, "on");
    }

    #[test]
    fn should_surface_query_fault_through_value() {
        let cap = OnOff::new().retrievable(true).with_initial(true);
        cap.fail(QueryError::new(QueryErrorCode::DeviceUnreachable));
        assert!(cap.value().is_err());
        cap.set(false);
        assert_eq!(cap.value().unwrap(), Some(false));
    }
}
