//! Toggle capability — auxiliary boolean switches (mute, backlight, …).

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::value::ValueCell;

use super::{
    CapabilityParameters, CapabilitySpecification, CapabilityType, ChangeFuture, ChangeHandler,
    ChangeOptions, ChangeRequest, StateRecord, invalid_value, unsupported,
};

/// Toggle instance names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleInstance {
    Backlight,
    ControlsLocked,
    Ionization,
    KeepWarm,
    Mute,
    Oscillation,
}

impl ToggleInstance {
    /// The wire name of this instance.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backlight => "backlight",
            Self::ControlsLocked => "controls_locked",
            Self::Ionization => "ionization",
            Self::KeepWarm => "keep_warm",
            Self::Mute => "mute",
            Self::Oscillation => "oscillation",
        }
    }
}

/// Parameters block: `{instance}`.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleParameters {
    pub instance: ToggleInstance,
}

/// Boolean auxiliary switch with a named instance.
#[derive(Debug, Clone)]
pub struct Toggle {
    instance: ToggleInstance,
    value: ValueCell<bool>,
    retrievable: bool,
    reportable: bool,
    on_change: Option<ChangeHandler<bool>>,
}

impl Toggle {
    /// Create a non-retrievable, non-reportable toggle with no handler.
    #[must_use]
    pub fn new(instance: ToggleInstance) -> Self {
        Self {
            instance,
            value: ValueCell::default(),
            retrievable: false,
            reportable: false,
            on_change: None,
        }
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

    /// Install the change handler (late binding; see module docs).
    pub fn set_change_handler(&mut self, handler: ChangeHandler<bool>) {
        self.on_change = Some(handler);
    }

    #[must_use]
    pub fn instance(&self) -> ToggleInstance {
        self.instance
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
    /// Panics when the capability is not retrievable.
    pub fn value(&self) -> Result<Option<bool>, QueryError> {
        assert!(self.retrievable, "value() read on non-retrievable toggle capability");
        self.value.read()
    }

    pub(super) fn specification(&self) -> CapabilitySpecification {
        CapabilitySpecification {
            type_id: CapabilityType::Toggle,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: Some(CapabilityParameters::Toggle(ToggleParameters {
                instance: self.instance,
            })),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self.value.read()?.map(|on| {
            StateRecord::capability(CapabilityType::Toggle, self.instance.as_str(), on.into())
        }))
    }

    pub(super) fn dispatch(
        &self,
        instance: &str,
        value: &serde_json::Value,
        options: ChangeOptions,
    ) -> ChangeFuture {
        let Some(requested) = value.as_bool() else {
            return invalid_value(CapabilityType::Toggle, instance, "expected a boolean value");
        };
        match &self.on_change {
            Some(handler) => handler.invoke(ChangeRequest {
                instance: instance.to_string(),
                value: requested,
                options,
            }),
            None => unsupported(CapabilityType::Toggle, instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionErrorCode;

    #[test]
    fn should_expose_specification_with_instance() {
        let cap = Toggle::new(ToggleInstance::Backlight).retrievable(true);
        let json = serde_json::to_value(cap.specification()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "devices.capabilities.toggle",
                "retrievable": true,
                "reportable": false,
                "parameters": {"instance": "backlight"},
            })
        );
    }

    #[test]
    fn should_produce_state_record_after_set() {
        let cap = Toggle::new(ToggleInstance::Backlight).retrievable(true);
        cap.set(true);
        let record = cap.value().unwrap();
        assert_eq!(record, Some(true));
        let state = cap.current().unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({
                "type": "devices.capabilities.toggle",
                "state": {"instance": "backlight", "value": true},
            })
        );
    }

    #[tokio::test]
    async fn should_reject_change_without_handler() {
        let cap = Toggle::new(ToggleInstance::Mute);
        let err = cap
            .dispatch("mute", &serde_json::json!(false), ChangeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ActionErrorCode::NotSupportedInCurrentMode);
        assert_eq!(err.capability, CapabilityType::Toggle);
    }
}
