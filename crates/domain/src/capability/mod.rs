//! Capabilities — controllable facets of a device.
//!
//! Each capability kind is a concrete struct ([`OnOff`], [`ColorSetting`],
//! [`Mode`], [`Range`], [`Toggle`]) wrapped by the [`Capability`] enum the
//! device aggregate stores. Kinds share three ideas:
//!
//! - the last observed value lives in a [`ValueCell`](crate::value::ValueCell)
//!   written only by the owning driver callback;
//! - a change handler typed to exactly the value that kind can hold, installed
//!   after construction (handlers usually need sibling capabilities and
//!   driver IO, so the capability is built first and the handler injected
//!   during device construction);
//! - serialization to a specification record and zero-or-one state record.

mod color_setting;
mod mode;
mod on_off;
mod range;
mod toggle;

pub use color_setting::{
    ColorModelKind, ColorSetting, ColorSettingBuilder, ColorValue, Hsv, TemperatureRange,
};
pub use mode::{Mode, ModeInstance, ModeValue};
pub use on_off::OnOff;
pub use range::{Range, RangeBuilder, RangeInstance, RangeUnit};
pub use toggle::{Toggle, ToggleInstance};

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ActionErrorCode, QueryError};

/// Capability kind tag; the wire string appears only at the serialization
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapabilityType {
    #[serde(rename = "devices.capabilities.on_off")]
    OnOff,
    #[serde(rename = "devices.capabilities.color_setting")]
    ColorSetting,
    #[serde(rename = "devices.capabilities.mode")]
    Mode,
    #[serde(rename = "devices.capabilities.range")]
    Range,
    #[serde(rename = "devices.capabilities.toggle")]
    Toggle,
}

impl CapabilityType {
    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnOff => "devices.capabilities.on_off",
            Self::ColorSetting => "devices.capabilities.color_setting",
            Self::Mode => "devices.capabilities.mode",
            Self::Range => "devices.capabilities.range",
            Self::Toggle => "devices.capabilities.toggle",
        }
    }

    /// Parse a wire tag; `None` for anything this bridge does not know.
    #[must_use]
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "devices.capabilities.on_off" => Some(Self::OnOff),
            "devices.capabilities.color_setting" => Some(Self::ColorSetting),
            "devices.capabilities.mode" => Some(Self::Mode),
            "devices.capabilities.range" => Some(Self::Range),
            "devices.capabilities.toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

impl std::fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state value as it crosses the wire: a scalar or a small color record,
/// never an opaque blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Hsv(Hsv),
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// One `{type, state: {instance, value}}` record in a state or report
/// snapshot. Shared by capabilities and properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    pub state: InstanceValue,
}

/// The `state` half of a [`StateRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceValue {
    pub instance: String,
    pub value: StateValue,
}

impl StateRecord {
    /// Build a record for a capability kind.
    #[must_use]
    pub fn capability(type_id: CapabilityType, instance: impl Into<String>, value: StateValue) -> Self {
        Self {
            type_id: type_id.as_str().to_string(),
            state: InstanceValue {
                instance: instance.into(),
                value,
            },
        }
    }
}

/// Specification record for one capability:
/// `{type, retrievable, reportable, parameters?}`.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilitySpecification {
    #[serde(rename = "type")]
    pub type_id: CapabilityType,
    pub retrievable: bool,
    pub reportable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<CapabilityParameters>,
}

/// Kind-specific parameter payloads, flattened on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CapabilityParameters {
    OnOff(on_off::OnOffParameters),
    ColorSetting(color_setting::ColorParameters),
    Mode(mode::ModeParameters),
    Range(range::RangeParameters),
    Toggle(toggle::ToggleParameters),
}

/// Extra options attached to a change request.
///
/// `relative` asks range-like handlers to treat the value as a delta;
/// `custom_data` carries the opaque per-device blob the platform echoes back
/// on action calls.
#[derive(Debug, Clone, Default)]
pub struct ChangeOptions {
    pub relative: bool,
    pub custom_data: Option<serde_json::Value>,
}

/// One decoded change request handed to a capability's handler.
#[derive(Debug, Clone)]
pub struct ChangeRequest<T> {
    /// Requested instance name.
    pub instance: String,
    /// Requested value, already decoded to the kind's value type.
    pub value: T,
    /// Extra request options.
    pub options: ChangeOptions,
}

/// The `(type, instance)` pair a handler actually applied the change to.
///
/// Usually echoes the request, but a delegating handler may attribute the
/// change elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub capability: CapabilityType,
    pub instance: String,
}

impl Applied {
    /// Attribute a change to the given key.
    #[must_use]
    pub fn new(capability: CapabilityType, instance: impl Into<String>) -> Self {
        Self {
            capability,
            instance: instance.into(),
        }
    }
}

/// Future produced by dispatching one change request.
pub type ChangeFuture = BoxFuture<'static, Result<Applied, ActionError>>;

/// Async change handler for one capability kind.
///
/// Installed after construction via `set_change_handler`; a capability
/// without one rejects every write with `NOT_SUPPORTED_IN_CURRENT_MODE`.
pub struct ChangeHandler<T>(Arc<dyn Fn(ChangeRequest<T>) -> ChangeFuture + Send + Sync>);

impl<T> ChangeHandler<T> {
    /// Wrap a handler function.
    pub fn new(handler: impl Fn(ChangeRequest<T>) -> ChangeFuture + Send + Sync + 'static) -> Self {
        Self(Arc::new(handler))
    }

    /// Invoke the handler with a decoded request.
    #[must_use]
    pub fn invoke(&self, request: ChangeRequest<T>) -> ChangeFuture {
        (self.0)(request)
    }
}

impl<T> Clone for ChangeHandler<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> std::fmt::Debug for ChangeHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChangeHandler(..)")
    }
}

/// Immediately-failing change future for capabilities without a handler.
pub(crate) fn unsupported(capability: CapabilityType, instance: &str) -> ChangeFuture {
    future::ready(Err(ActionError::new(
        capability,
        instance,
        ActionErrorCode::NotSupportedInCurrentMode,
    )))
    .boxed()
}

/// Immediately-failing change future for undecodable request values.
pub(crate) fn invalid_value(capability: CapabilityType, instance: &str, detail: &str) -> ChangeFuture {
    future::ready(Err(ActionError::with_message(
        capability,
        instance,
        ActionErrorCode::InvalidValue,
        detail,
    )))
    .boxed()
}

/// A controllable device facet of any kind.
///
/// Clones share observed-value cells and handlers with the structs they were
/// built from, so a driver can keep writing through its own handle after the
/// capability has been moved into a device.
#[derive(Debug, Clone)]
pub enum Capability {
    OnOff(OnOff),
    ColorSetting(ColorSetting),
    Mode(Mode),
    Range(Range),
    Toggle(Toggle),
}

impl Capability {
    /// Kind tag of this capability.
    #[must_use]
    pub fn type_id(&self) -> CapabilityType {
        match self {
            Self::OnOff(_) => CapabilityType::OnOff,
            Self::ColorSetting(_) => CapabilityType::ColorSetting,
            Self::Mode(_) => CapabilityType::Mode,
            Self::Range(_) => CapabilityType::Range,
            Self::Toggle(_) => CapabilityType::Toggle,
        }
    }

    /// Instance names this capability answers to. Non-empty; only
    /// [`ColorSetting`] exposes more than one.
    #[must_use]
    pub fn instances(&self) -> Vec<&'static str> {
        match self {
            Self::OnOff(_) => vec![OnOff::INSTANCE],
            Self::ColorSetting(cap) => cap.instances(),
            Self::Mode(cap) => vec![cap.instance().as_str()],
            Self::Range(cap) => vec![cap.instance().as_str()],
            Self::Toggle(cap) => vec![cap.instance().as_str()],
        }
    }

    /// Whether this capability can be queried.
    #[must_use]
    pub fn retrievable(&self) -> bool {
        match self {
            Self::OnOff(cap) => cap.is_retrievable(),
            Self::ColorSetting(cap) => cap.is_retrievable(),
            Self::Mode(cap) => cap.is_retrievable(),
            Self::Range(cap) => cap.is_retrievable(),
            Self::Toggle(cap) => cap.is_retrievable(),
        }
    }

    /// Whether a value change should be pushed out of band.
    #[must_use]
    pub fn reportable(&self) -> bool {
        match self {
            Self::OnOff(cap) => cap.is_reportable(),
            Self::ColorSetting(cap) => cap.is_reportable(),
            Self::Mode(cap) => cap.is_reportable(),
            Self::Range(cap) => cap.is_reportable(),
            Self::Toggle(cap) => cap.is_reportable(),
        }
    }

    /// Specification record for device listing.
    #[must_use]
    pub fn specification(&self) -> CapabilitySpecification {
        match self {
            Self::OnOff(cap) => cap.specification(),
            Self::ColorSetting(cap) => cap.specification(),
            Self::Mode(cap) => cap.specification(),
            Self::Range(cap) => cap.specification(),
            Self::Toggle(cap) => cap.specification(),
        }
    }

    /// Current state record for the query path.
    ///
    /// Must only be called on retrievable capabilities; the device aggregate
    /// filters before calling. Yields `Ok(None)` while the value is unknown.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    ///
    /// # Panics
    ///
    /// Panics when called on a non-retrievable capability — a contract
    /// violation by the caller, not a runtime condition.
    pub fn state(&self) -> Result<Option<StateRecord>, QueryError> {
        assert!(
            self.retrievable(),
            "state() queried on non-retrievable capability {}",
            self.type_id()
        );
        self.current()
    }

    /// Current state record without the retrievable gate; the report path
    /// uses this for reportable-but-not-retrievable capabilities.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    pub fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        match self {
            Self::OnOff(cap) => cap.current(),
            Self::ColorSetting(cap) => cap.current(),
            Self::Mode(cap) => cap.current(),
            Self::Range(cap) => cap.current(),
            Self::Toggle(cap) => cap.current(),
        }
    }

    /// Decode a raw request value and dispatch it to this capability's
    /// change handler.
    ///
    /// Decoding failures yield an immediately-ready `INVALID_VALUE` future;
    /// a missing handler yields `NOT_SUPPORTED_IN_CURRENT_MODE`. The handler
    /// itself never observes an undecodable value.
    #[must_use]
    pub fn dispatch(
        &self,
        instance: &str,
        value: &serde_json::Value,
        options: ChangeOptions,
    ) -> ChangeFuture {
        match self {
            Self::OnOff(cap) => cap.dispatch(instance, value, options),
            Self::ColorSetting(cap) => cap.dispatch(instance, value, options),
            Self::Mode(cap) => cap.dispatch(instance, value, options),
            Self::Range(cap) => cap.dispatch(instance, value, options),
            Self::Toggle(cap) => cap.dispatch(instance, value, options),
        }
    }
}

impl From<OnOff> for Capability {
    fn from(cap: OnOff) -> Self {
        Self::OnOff(cap)
    }
}

impl From<ColorSetting> for Capability {
    fn from(cap: ColorSetting) -> Self {
        Self::ColorSetting(cap)
    }
}

impl From<Mode> for Capability {
    fn from(cap: Mode) -> Self {
        Self::Mode(cap)
    }
}

impl From<Range> for Capability {
    fn from(cap: Range) -> Self {
        Self::Range(cap)
    }
}

impl From<Toggle> for Capability {
    fn from(cap: Toggle) -> Self {
        Self::Toggle(cap)
    }
}
