//! Mode capability — enumerated operating modes.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, ValidationError};
use crate::value::ValueCell;

use super::{
    CapabilityParameters, CapabilitySpecification, CapabilityType, ChangeFuture, ChangeHandler,
    ChangeOptions, ChangeRequest, StateRecord, StateValue, invalid_value, unsupported,
};

/// Mode instance names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeInstance {
    CleanupMode,
    CoffeeMode,
    FanSpeed,
    InputSource,
    Program,
    Swing,
    Thermostat,
    WorkSpeed,
}

impl ModeInstance {
    /// The wire name of this instance.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CleanupMode => "cleanup_mode",
            Self::CoffeeMode => "coffee_mode",
            Self::FanSpeed => "fan_speed",
            Self::InputSource => "input_source",
            Self::Program => "program",
            Self::Swing => "swing",
            Self::Thermostat => "thermostat",
            Self::WorkSpeed => "work_speed",
        }
    }
}

/// The closed set of mode values the platform understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeValue {
    Americano,
    Auto,
    Cappuccino,
    Cool,
    Dry,
    Eco,
    Espresso,
    FanOnly,
    Heat,
    High,
    Latte,
    Low,
    Max,
    Medium,
    Min,
    Normal,
    Quiet,
    Turbo,
}

impl ModeValue {
    /// The wire name of this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Americano => "americano",
            Self::Auto => "auto",
            Self::Cappuccino => "cappuccino",
            Self::Cool => "cool",
            Self::Dry => "dry",
            Self::Eco => "eco",
            Self::Espresso => "espresso",
            Self::FanOnly => "fan_only",
            Self::Heat => "heat",
            Self::High => "high",
            Self::Latte => "latte",
            Self::Low => "low",
            Self::Max => "max",
            Self::Medium => "medium",
            Self::Min => "min",
            Self::Normal => "normal",
            Self::Quiet => "quiet",
            Self::Turbo => "turbo",
        }
    }

    /// Parse a wire name; `None` for anything unknown.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "americano" => Some(Self::Americano),
            "auto" => Some(Self::Auto),
            "cappuccino" => Some(Self::Cappuccino),
            "cool" => Some(Self::Cool),
            "dry" => Some(Self::Dry),
            "eco" => Some(Self::Eco),
            "espresso" => Some(Self::Espresso),
            "fan_only" => Some(Self::FanOnly),
            "heat" => Some(Self::Heat),
            "high" => Some(Self::High),
            "latte" => Some(Self::Latte),
            "low" => Some(Self::Low),
            "max" => Some(Self::Max),
            "medium" => Some(Self::Medium),
            "min" => Some(Self::Min),
            "normal" => Some(Self::Normal),
            "quiet" => Some(Self::Quiet),
            "turbo" => Some(Self::Turbo),
            _ => None,
        }
    }
}

/// One entry of the `modes` parameter list.
#[derive(Debug, Clone, Serialize)]
pub struct ModeEntry {
    pub value: ModeValue,
}

/// Parameters block: `{instance, modes}`.
#[derive(Debug, Clone, Serialize)]
pub struct ModeParameters {
    pub instance: ModeInstance,
    pub modes: Vec<ModeEntry>,
}

/// Enumerated operating mode selector.
#[derive(Debug, Clone)]
pub struct Mode {
    instance: ModeInstance,
    modes: Vec<ModeValue>,
    value: ValueCell<ModeValue>,
    retrievable: bool,
    reportable: bool,
    on_change: Option<ChangeHandler<ModeValue>>,
}

impl Mode {
    /// Create a mode capability with its allowed mode list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyModes`] when `modes` is empty.
    pub fn new(instance: ModeInstance, modes: Vec<ModeValue>) -> Result<Self, ValidationError> {
        if modes.is_empty() {
            return Err(ValidationError::EmptyModes);
        }
        Ok(Self {
            instance,
            modes,
            value: ValueCell::default(),
            retrievable: false,
            reportable: false,
            on_change: None,
        })
    }

    /// Seed the observed value.
    #[must_use]
    pub fn with_initial(self, value: ModeValue) -> Self {
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
    pub fn set_change_handler(&mut self, handler: ChangeHandler<ModeValue>) {
        self.on_change = Some(handler);
    }

    #[must_use]
    pub fn instance(&self) -> ModeInstance {
        self.instance
    }

    /// Allowed modes, in declaration order.
    #[must_use]
    pub fn modes(&self) -> &[ModeValue] {
        &self.modes
    }

    #[must_use]
    pub fn is_retrievable(&self) -> bool {
        self.retrievable
    }

    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.reportable
    }

    /// Record a hardware-observed mode. Clears any pending query fault.
    pub fn set(&self, value: ModeValue) {
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
    pub fn value(&self) -> Result<Option<ModeValue>, QueryError> {
        assert!(self.retrievable, "value() read on non-retrievable mode capability");
        self.value.read()
    }

    pub(super) fn specification(&self) -> CapabilitySpecification {
        CapabilitySpecification {
            type_id: CapabilityType::Mode,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: Some(CapabilityParameters::Mode(ModeParameters {
                instance: self.instance,
                modes: self.modes.iter().map(|&value| ModeEntry { value }).collect(),
            })),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self.value.read()?.map(|mode| {
            StateRecord::capability(
                CapabilityType::Mode,
                self.instance.as_str(),
                StateValue::Text(mode.as_str().to_string()),
            )
        }))
    }

    pub(super) fn dispatch(
        &self,
        instance: &str,
        value: &serde_json::Value,
        options: ChangeOptions,
    ) -> ChangeFuture {
        let Some(requested) = value.as_str().and_then(ModeValue::from_wire) else {
            return invalid_value(CapabilityType::Mode, instance, "expected a known mode name");
        };
        if !self.modes.contains(&requested) {
            return invalid_value(
                CapabilityType::Mode,
                instance,
                "mode is not in the allowed set for this capability",
            );
        }
        match &self.on_change {
            Some(handler) => handler.invoke(ChangeRequest {
                instance: instance.to_string(),
                value: requested,
                options,
            }),
            None => unsupported(CapabilityType::Mode, instance),
        }
    }
}
