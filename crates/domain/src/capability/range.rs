//! Range capability — numeric setpoints (brightness, volume, position, …).

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, ValidationError};
use crate::value::ValueCell;

use super::{
    CapabilityParameters, CapabilitySpecification, CapabilityType, ChangeFuture, ChangeHandler,
    ChangeOptions, ChangeRequest, StateRecord, invalid_value, unsupported,
};

/// Range instance names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeInstance {
    Brightness,
    Channel,
    Humidity,
    Open,
    Temperature,
    Volume,
}

impl RangeInstance {
    /// The wire name of this instance.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Channel => "channel",
            Self::Humidity => "humidity",
            Self::Open => "open",
            Self::Temperature => "temperature",
            Self::Volume => "volume",
        }
    }

    /// Instances measured in percent, bounded to `[0, 100]`.
    #[must_use]
    pub fn is_percentage(self) -> bool {
        matches!(self, Self::Brightness | Self::Humidity | Self::Open)
    }
}

/// Range units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeUnit {
    #[serde(rename = "unit.percent")]
    Percent,
    #[serde(rename = "unit.temperature.celsius")]
    TemperatureCelsius,
    #[serde(rename = "unit.temperature.kelvin")]
    TemperatureKelvin,
}

impl RangeUnit {
    /// The wire name of this unit.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "unit.percent",
            Self::TemperatureCelsius => "unit.temperature.celsius",
            Self::TemperatureKelvin => "unit.temperature.kelvin",
        }
    }
}

/// The `range` sub-block of the parameters, present when any bound is set.
#[derive(Debug, Clone, Serialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
}

/// Parameters block: `{instance, random_access, unit?, range?}`.
#[derive(Debug, Clone, Serialize)]
pub struct RangeParameters {
    pub instance: RangeInstance,
    pub random_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<RangeUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeBounds>,
}

/// Numeric setpoint with optional unit and bounds.
#[derive(Debug, Clone)]
pub struct Range {
    instance: RangeInstance,
    unit: Option<RangeUnit>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    precision: Option<f64>,
    random_access: bool,
    value: ValueCell<f64>,
    retrievable: bool,
    reportable: bool,
    on_change: Option<ChangeHandler<f64>>,
}

/// Fallible builder for [`Range`]; validation happens in
/// [`build`](RangeBuilder::build), never at use time.
#[derive(Debug)]
pub struct RangeBuilder {
    instance: RangeInstance,
    unit: Option<RangeUnit>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    precision: Option<f64>,
    random_access: bool,
    initial: Option<f64>,
    retrievable: bool,
    reportable: bool,
}

impl Range {
    /// Start building a range for the given instance.
    ///
    /// Defaults: no unit, no bounds, precision 1, random access, neither
    /// retrievable nor reportable.
    #[must_use]
    pub fn builder(instance: RangeInstance) -> RangeBuilder {
        RangeBuilder {
            instance,
            unit: None,
            min_value: None,
            max_value: None,
            precision: Some(1.0),
            random_access: true,
            initial: None,
            retrievable: false,
            reportable: false,
        }
    }

    /// Install the change handler (late binding; see module docs).
    pub fn set_change_handler(&mut self, handler: ChangeHandler<f64>) {
        self.on_change = Some(handler);
    }

    #[must_use]
    pub fn instance(&self) -> RangeInstance {
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

    /// Configured lower bound.
    #[must_use]
    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    /// Configured upper bound.
    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// Record a hardware-observed value. Clears any pending query fault.
    pub fn set(&self, value: f64) {
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
    pub fn value(&self) -> Result<Option<f64>, QueryError> {
        assert!(self.retrievable, "value() read on non-retrievable range capability");
        self.value.read()
    }

    /// Ungated read for handlers that need the last observed value (e.g.
    /// applying a relative change).
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    pub fn observed(&self) -> Result<Option<f64>, QueryError> {
        self.value.read()
    }

    pub(super) fn specification(&self) -> CapabilitySpecification {
        let range = (self.min_value.is_some() || self.max_value.is_some() || self.precision.is_some())
            .then(|| RangeBounds {
                min: self.min_value,
                max: self.max_value,
                precision: self.precision,
            });
        CapabilitySpecification {
            type_id: CapabilityType::Range,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: Some(CapabilityParameters::Range(RangeParameters {
                instance: self.instance,
                random_access: self.random_access,
                unit: self.unit,
                range,
            })),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self.value.read()?.map(|value| {
            StateRecord::capability(CapabilityType::Range, self.instance.as_str(), value.into())
        }))
    }

    pub(super) fn dispatch(
        &self,
        instance: &str,
        value: &serde_json::Value,
        options: ChangeOptions,
    ) -> ChangeFuture {
        let Some(requested) = value.as_f64() else {
            return invalid_value(CapabilityType::Range, instance, "expected a numeric value");
        };
        match &self.on_change {
            Some(handler) => handler.invoke(ChangeRequest {
                instance: instance.to_string(),
                value: requested,
                options,
            }),
            None => unsupported(CapabilityType::Range, instance),
        }
    }
}

impl RangeBuilder {
    /// Attach a unit; validated against the instance in [`build`](Self::build).
    #[must_use]
    pub fn unit(mut self, unit: RangeUnit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the lower bound.
    #[must_use]
    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Set the upper bound.
    #[must_use]
    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Set the setpoint precision.
    #[must_use]
    pub fn precision(mut self, precision: f64) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Declare whether arbitrary setpoints are reachable (as opposed to
    /// step-only adjustment).
    #[must_use]
    pub fn random_access(mut self, random_access: bool) -> Self {
        self.random_access = random_access;
        self
    }

    /// Seed the observed value.
    #[must_use]
    pub fn initial(mut self, value: f64) -> Self {
        self.initial = Some(value);
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

    /// Validate and build the capability.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the unit does not fit the instance,
    /// when a percentage instance is configured outside `[0, 100]`, or when
    /// the bounds are inverted.
    pub fn build(self) -> Result<Range, ValidationError> {
        let percent_mismatch =
            self.unit == Some(RangeUnit::Percent) && !self.instance.is_percentage();
        let temperature_mismatch = matches!(
            self.unit,
            Some(RangeUnit::TemperatureCelsius | RangeUnit::TemperatureKelvin)
        ) && self.instance != RangeInstance::Temperature;
        if percent_mismatch || temperature_mismatch {
            return Err(ValidationError::UnitMismatch {
                unit: self.unit.map_or_else(String::new, |unit| unit.as_str().to_string()),
                instance: self.instance.as_str().to_string(),
            });
        }

        if self.instance.is_percentage() {
            if let Some(min) = self.min_value
                && min < 0.0
            {
                return Err(ValidationError::NegativeMinimum {
                    instance: self.instance.as_str().to_string(),
                    min,
                });
            }
            if let Some(max) = self.max_value
                && max > 100.0
            {
                return Err(ValidationError::ExcessiveMaximum {
                    instance: self.instance.as_str().to_string(),
                    max,
                });
            }
        }

        if let (Some(min), Some(max)) = (self.min_value, self.max_value)
            && min > max
        {
            return Err(ValidationError::InvertedBounds { min, max });
        }

        Ok(Range {
            instance: self.instance,
            unit: self.unit,
            min_value: self.min_value,
            max_value: self.max_value,
            precision: self.precision,
            random_access: self.random_access,
            value: ValueCell::new(self.initial),
            retrievable: self.retrievable,
            reportable: self.reportable,
            on_change: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionErrorCode;

    #[test]
    fn should_build_full_specification() {
        let cap = Range::builder(RangeInstance::Humidity)
            .unit(RangeUnit::Percent)
            .min_value(50.0)
            .max_value(100.0)
            .retrievable(true)
            .build()
            .unwrap();
        let json = serde_json::to_value(cap.specification()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "devices.capabilities.range",
                "retrievable": true,
                "reportable": false,
                "parameters": {
                    "instance": "humidity",
                    "random_access": true,
                    "unit": "unit.percent",
                    "range": {"min": 50.0, "max": 100.0, "precision": 1.0},
                },
            })
        );
    }

    #[test]
    fn should_reject_percent_unit_for_temperature() {
        let result = Range::builder(RangeInstance::Temperature)
            .unit(RangeUnit::Percent)
            .build();
        assert!(matches!(result, Err(ValidationError::UnitMismatch { .. })));
    }

    #[test]
    fn should_reject_temperature_unit_for_brightness() {
        let result = Range::builder(RangeInstance::Brightness)
            .unit(RangeUnit::TemperatureCelsius)
            .build();
        assert!(matches!(result, Err(ValidationError::UnitMismatch { .. })));
    }

    #[test]
    fn should_reject_negative_minimum_for_percentage_instance() {
        let result = Range::builder(RangeInstance::Brightness)
            .unit(RangeUnit::Percent)
            .min_value(-10.0)
            .build();
        assert!(matches!(result, Err(ValidationError::NegativeMinimum { .. })));
    }

    #[test]
    fn should_reject_maximum_above_hundred_for_percentage_instance() {
        let result = Range::builder(RangeInstance::Humidity)
            .unit(RangeUnit::Percent)
            .max_value(150.0)
            .build();
        assert!(matches!(result, Err(ValidationError::ExcessiveMaximum { .. })));
    }

    #[test]
    fn should_reject_inverted_bounds() {
        let result = Range::builder(RangeInstance::Volume)
            .min_value(80.0)
            .max_value(20.0)
            .build();
        assert!(matches!(result, Err(ValidationError::InvertedBounds { .. })));
    }

    #[test]
    fn should_allow_unbounded_channel_without_unit() {
        let cap = Range::builder(RangeInstance::Channel).build().unwrap();
        assert_eq!(cap.instance(), RangeInstance::Channel);
    }

    #[test]
    fn should_expose_state_after_set() {
        let cap = Range::builder(RangeInstance::Brightness)
            .retrievable(true)
            .build()
            .unwrap();
        cap.set(60.0);
        assert_eq!(cap.value().unwrap(), Some(60.0));
    }

    #[tokio::test]
    async fn should_reject_non_numeric_value() {
        let cap = Range::builder(RangeInstance::Volume).build().unwrap();
        let err = cap
            .dispatch("volume", &serde_json::json!("loud"), ChangeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ActionErrorCode::InvalidValue);
    }
}
