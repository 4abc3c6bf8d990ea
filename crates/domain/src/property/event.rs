//! Event properties — discrete hardware events with enumerated values.

use serde::{Deserialize, Serialize};

use crate::capability::{StateRecord, StateValue};
use crate::error::{QueryError, ValidationError};
use crate::value::ValueCell;

use super::{PropertyParameters, PropertySpecification, PropertyType};

/// Event property instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventInstance {
    BatteryLevel,
    Button,
    Gas,
    Motion,
    Open,
    Smoke,
    Vibration,
    WaterLeak,
    WaterLevel,
}

impl EventInstance {
    /// The wire name of this instance.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BatteryLevel => "battery_level",
            Self::Button => "button",
            Self::Gas => "gas",
            Self::Motion => "motion",
            Self::Open => "open",
            Self::Smoke => "smoke",
            Self::Vibration => "vibration",
            Self::WaterLeak => "water_leak",
            Self::WaterLevel => "water_level",
        }
    }

    /// The enumerated values this instance can report.
    #[must_use]
    pub fn allowed_values(self) -> &'static [EventValue] {
        match self {
            Self::BatteryLevel | Self::WaterLevel => &[EventValue::Low, EventValue::Normal],
            Self::Button => &[
                EventValue::Click,
                EventValue::DoubleClick,
                EventValue::LongPress,
            ],
            Self::Gas | Self::Smoke => &[
                EventValue::Detected,
                EventValue::NotDetected,
                EventValue::High,
            ],
            Self::Motion => &[EventValue::Detected, EventValue::NotDetected],
            Self::Open => &[EventValue::Opened, EventValue::Closed],
            Self::Vibration => &[
                EventValue::Tilt,
                EventValue::Fall,
                EventValue::Vibration,
            ],
            Self::WaterLeak => &[EventValue::Dry, EventValue::Leak],
        }
    }
}

/// The closed set of event values across all instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventValue {
    Click,
    Closed,
    Detected,
    DoubleClick,
    Dry,
    Fall,
    High,
    Leak,
    LongPress,
    Low,
    Normal,
    NotDetected,
    Opened,
    Tilt,
    Vibration,
}

impl EventValue {
    /// The wire name of this value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Closed => "closed",
            Self::Detected => "detected",
            Self::DoubleClick => "double_click",
            Self::Dry => "dry",
            Self::Fall => "fall",
            Self::High => "high",
            Self::Leak => "leak",
            Self::LongPress => "long_press",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::NotDetected => "not_detected",
            Self::Opened => "opened",
            Self::Tilt => "tilt",
            Self::Vibration => "vibration",
        }
    }
}

/// One entry of the `events` parameter list.
#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub value: EventValue,
}

/// Parameters block: `{instance, events}`.
#[derive(Debug, Clone, Serialize)]
pub struct EventParameters {
    pub instance: EventInstance,
    pub events: Vec<EventEntry>,
}

/// Discrete event reporter (motion, leak, button press, …).
#[derive(Debug, Clone)]
pub struct Event {
    instance: EventInstance,
    value: ValueCell<EventValue>,
    retrievable: bool,
    reportable: bool,
}

impl Event {
    /// Create an event property for the given instance.
    #[must_use]
    pub fn new(instance: EventInstance) -> Self {
        Self {
            instance,
            value: ValueCell::default(),
            retrievable: true,
            reportable: false,
        }
    }

    /// Seed the observed value, validated like [`assign`](Self::assign).
    ///
    /// # Errors
    ///
    /// Returns the same validation errors as [`assign`](Self::assign).
    pub fn with_initial(self, value: EventValue) -> Result<Self, ValidationError> {
        self.assign(value)?;
        Ok(self)
    }

    /// Configure retrievability and reportability together.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnreportableProperty`] when both flags are
    /// off.
    pub fn reporting(mut self, retrievable: bool, reportable: bool) -> Result<Self, ValidationError> {
        if !retrievable && !reportable {
            return Err(ValidationError::UnreportableProperty {
                instance: self.instance.as_str().to_string(),
            });
        }
        self.retrievable = retrievable;
        self.reportable = reportable;
        Ok(self)
    }

    /// Mark value changes as push-notification eligible.
    #[must_use]
    pub fn reportable(mut self, reportable: bool) -> Self {
        self.reportable = reportable;
        self
    }

    #[must_use]
    pub fn instance(&self) -> EventInstance {
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

    /// Record a hardware-observed event after validating it against the
    /// instance's enumerated set. Clears any pending query fault.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownEventValue`] for values outside the
    /// instance's set.
    pub fn assign(&self, value: EventValue) -> Result<(), ValidationError> {
        if !self.instance.allowed_values().contains(&value) {
            return Err(ValidationError::UnknownEventValue {
                instance: self.instance.as_str().to_string(),
                value: value.as_str().to_string(),
            });
        }
        self.value.set(value);
        Ok(())
    }

    /// Raise a query fault on this facet.
    pub fn fail(&self, error: QueryError) {
        self.value.fail(error);
    }

    /// Drop a pending query fault without a new reading.
    pub fn clear_fault(&self) {
        self.value.clear_fault();
    }

    /// Current value.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    ///
    /// # Panics
    ///
    /// Panics when the property is not retrievable.
    pub fn value(&self) -> Result<Option<EventValue>, QueryError> {
        assert!(self.retrievable, "value() read on non-retrievable event property");
        self.value.read()
    }

    pub(super) fn specification(&self) -> PropertySpecification {
        PropertySpecification {
            type_id: PropertyType::Event,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: PropertyParameters::Event(EventParameters {
                instance: self.instance,
                events: self
                    .instance
                    .allowed_values()
                    .iter()
                    .map(|&value| EventEntry { value })
                    .collect(),
            }),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self.value.read()?.map(|event| {
            StateRecord::property(
                PropertyType::Event,
                self.instance.as_str(),
                StateValue::Text(event.as_str().to_string()),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_list_allowed_events_in_specification() {
        let prop = Event::new(EventInstance::Motion);
        let json = serde_json::to_value(prop.specification()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "devices.properties.event",
                "retrievable": true,
                "reportable": false,
                "parameters": {
                    "instance": "motion",
                    "events": [{"value": "detected"}, {"value": "not_detected"}],
                },
            })
        );
    }

    #[test]
    fn should_accept_value_from_instance_set() {
        let prop = Event::new(EventInstance::WaterLeak);
        prop.assign(EventValue::Leak).unwrap();
        assert_eq!(prop.value().unwrap(), Some(EventValue::Leak));
    }

    #[test]
    fn should_reject_value_outside_instance_set() {
        let prop = Event::new(EventInstance::Motion);
        let err = prop.assign(EventValue::Click).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownEventValue { .. }));
    }

    #[test]
    fn should_expose_event_as_wire_string_in_state() {
        let prop = Event::new(EventInstance::Button);
        prop.assign(EventValue::DoubleClick).unwrap();
        let record = prop.current().unwrap().unwrap();
        assert_eq!(record.state.value, StateValue::Text("double_click".to_string()));
    }

    #[test]
    fn should_reject_unobservable_event_property() {
        let result = Event::new(EventInstance::Gas).reporting(false, false);
        assert!(matches!(
            result,
            Err(ValidationError::UnreportableProperty { .. })
        ));
    }
}
