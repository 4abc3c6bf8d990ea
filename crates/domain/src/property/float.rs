//! Float properties — numeric telemetry with per-instance invariants.

use serde::{Deserialize, Serialize};

use crate::capability::StateRecord;
use crate::error::{QueryError, ValidationError};
use crate::value::ValueCell;

use super::{PropertyParameters, PropertySpecification, PropertyType};

/// Float property instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatInstance {
    Amperage,
    Co2Level,
    Humidity,
    Power,
    Temperature,
    Voltage,
    WaterLevel,
}

impl FloatInstance {
    /// The wire name of this instance.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amperage => "amperage",
            Self::Co2Level => "co2_level",
            Self::Humidity => "humidity",
            Self::Power => "power",
            Self::Temperature => "temperature",
            Self::Voltage => "voltage",
            Self::WaterLevel => "water_level",
        }
    }
}

/// Float property units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatUnit {
    #[serde(rename = "unit.ampere")]
    Ampere,
    #[serde(rename = "unit.ppm")]
    Ppm,
    #[serde(rename = "unit.percent")]
    Percent,
    #[serde(rename = "unit.watt")]
    Watt,
    #[serde(rename = "unit.temperature.celsius")]
    Celsius,
    #[serde(rename = "unit.temperature.kelvin")]
    Kelvin,
    #[serde(rename = "unit.volt")]
    Volt,
}

impl FloatUnit {
    /// The wire name of this unit.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ampere => "unit.ampere",
            Self::Ppm => "unit.ppm",
            Self::Percent => "unit.percent",
            Self::Watt => "unit.watt",
            Self::Celsius => "unit.temperature.celsius",
            Self::Kelvin => "unit.temperature.kelvin",
            Self::Volt => "unit.volt",
        }
    }
}

/// Parameters block: `{instance, unit}`.
#[derive(Debug, Clone, Serialize)]
pub struct FloatParameters {
    pub instance: FloatInstance,
    pub unit: FloatUnit,
}

/// Numeric telemetry value with a fixed instance/unit pairing.
#[derive(Debug, Clone)]
pub struct Float {
    instance: FloatInstance,
    unit: FloatUnit,
    value: ValueCell<f64>,
    retrievable: bool,
    reportable: bool,
}

impl Float {
    fn with(instance: FloatInstance, unit: FloatUnit) -> Self {
        Self {
            instance,
            unit,
            value: ValueCell::default(),
            retrievable: true,
            reportable: false,
        }
    }

    /// Current draw in amperes; must be positive.
    #[must_use]
    pub fn amperage() -> Self {
        Self::with(FloatInstance::Amperage, FloatUnit::Ampere)
    }

    /// CO₂ concentration in ppm; must be positive.
    #[must_use]
    pub fn co2_level() -> Self {
        Self::with(FloatInstance::Co2Level, FloatUnit::Ppm)
    }

    /// Relative humidity in percent, `[0, 100]`.
    #[must_use]
    pub fn humidity() -> Self {
        Self::with(FloatInstance::Humidity, FloatUnit::Percent)
    }

    /// Power draw in watts; must not be negative.
    #[must_use]
    pub fn power() -> Self {
        Self::with(FloatInstance::Power, FloatUnit::Watt)
    }

    /// Temperature in the given unit; bounded below by absolute zero.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnitMismatch`] for non-temperature units.
    pub fn temperature(unit: FloatUnit) -> Result<Self, ValidationError> {
        if !matches!(unit, FloatUnit::Celsius | FloatUnit::Kelvin) {
            return Err(ValidationError::UnitMismatch {
                unit: unit.as_str().to_string(),
                instance: FloatInstance::Temperature.as_str().to_string(),
            });
        }
        Ok(Self::with(FloatInstance::Temperature, unit))
    }

    /// Supply voltage in volts; must be positive.
    #[must_use]
    pub fn voltage() -> Self {
        Self::with(FloatInstance::Voltage, FloatUnit::Volt)
    }

    /// Water level in percent, `[0, 100]`.
    #[must_use]
    pub fn water_level() -> Self {
        Self::with(FloatInstance::WaterLevel, FloatUnit::Percent)
    }

    /// Seed the observed value, validated like [`assign`](Self::assign).
    ///
    /// # Errors
    ///
    /// Returns the same validation errors as [`assign`](Self::assign).
    pub fn with_initial(self, value: f64) -> Result<Self, ValidationError> {
        self.assign(value)?;
        Ok(self)
    }

    /// Configure retrievability and reportability together.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnreportableProperty`] when both flags are
    /// off — a property that cannot be queried must be reportable.
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
    pub fn instance(&self) -> FloatInstance {
        self.instance
    }

    #[must_use]
    pub fn unit(&self) -> FloatUnit {
        self.unit
    }

    #[must_use]
    pub fn is_retrievable(&self) -> bool {
        self.retrievable
    }

    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.reportable
    }

    /// Record a hardware-observed value after validating the instance's
    /// invariants. Clears any pending query fault.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the value violates the instance's
    /// physical bounds; the stored value is left untouched.
    pub fn assign(&self, value: f64) -> Result<(), ValidationError> {
        self.validate(value)?;
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
    pub fn value(&self) -> Result<Option<f64>, QueryError> {
        assert!(self.retrievable, "value() read on non-retrievable float property");
        self.value.read()
    }

    fn validate(&self, value: f64) -> Result<(), ValidationError> {
        let instance = self.instance.as_str().to_string();
        match self.instance {
            FloatInstance::Amperage | FloatInstance::Co2Level | FloatInstance::Voltage => {
                if value <= 0.0 {
                    return Err(ValidationError::NotPositive { instance, value });
                }
            }
            FloatInstance::Power => {
                if value < 0.0 {
                    return Err(ValidationError::BelowMinimum {
                        instance,
                        min: 0.0,
                        value,
                    });
                }
            }
            FloatInstance::Humidity | FloatInstance::WaterLevel => {
                if value < 0.0 {
                    return Err(ValidationError::BelowMinimum {
                        instance,
                        min: 0.0,
                        value,
                    });
                }
                if value > 100.0 {
                    return Err(ValidationError::AboveMaximum {
                        instance,
                        max: 100.0,
                        value,
                    });
                }
            }
            FloatInstance::Temperature => {
                let absolute_zero = match self.unit {
                    FloatUnit::Celsius => -273.15,
                    _ => 0.0,
                };
                if value < absolute_zero {
                    return Err(ValidationError::BelowAbsoluteZero {
                        unit: self.unit.as_str().to_string(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    pub(super) fn specification(&self) -> PropertySpecification {
        PropertySpecification {
            type_id: PropertyType::Float,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: PropertyParameters::Float(FloatParameters {
                instance: self.instance,
                unit: self.unit,
            }),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self.value.read()?.map(|value| {
            StateRecord::property(PropertyType::Float, self.instance.as_str(), value.into())
        }))
    }
}
