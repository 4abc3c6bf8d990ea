//! Error taxonomy shared across the workspace.
//!
//! Three failure families map onto the protocol's error envelopes:
//! construction-time [`ValidationError`]s are fatal to building a facet,
//! [`QueryError`]s replace a whole device's state envelope, and
//! [`ActionError`]s surface as individual action-result entries without
//! aborting sibling changes. [`NotifyError`] reports a rejected push.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityType;

/// Device-level query failure codes, serialized as the platform's
/// SCREAMING_SNAKE_CASE strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryErrorCode {
    DeviceUnreachable,
    DeviceBusy,
    DeviceNotFound,
    InternalError,
}

impl QueryErrorCode {
    /// The wire string for this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceUnreachable => "DEVICE_UNREACHABLE",
            Self::DeviceBusy => "DEVICE_BUSY",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-capability action failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionErrorCode {
    DeviceUnreachable,
    DeviceBusy,
    DeviceNotFound,
    InternalError,
    InvalidAction,
    InvalidValue,
    NotSupportedInCurrentMode,
}

impl ActionErrorCode {
    /// The wire string for this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceUnreachable => "DEVICE_UNREACHABLE",
            Self::DeviceBusy => "DEVICE_BUSY",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
            Self::InvalidAction => "INVALID_ACTION",
            Self::InvalidValue => "INVALID_VALUE",
            Self::NotSupportedInCurrentMode => "NOT_SUPPORTED_IN_CURRENT_MODE",
        }
    }
}

impl std::fmt::Display for ActionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-device query failure.
///
/// Raised while reading any single retrievable facet; the device envelope
/// becomes `{id, error_code, error_message}` with no partial arrays.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct QueryError {
    /// Protocol error code.
    pub code: QueryErrorCode,
    /// Human-readable detail, defaults to the wire code.
    pub message: String,
}

impl QueryError {
    /// Build a failure carrying the code's wire string as its message.
    #[must_use]
    pub fn new(code: QueryErrorCode) -> Self {
        Self {
            code,
            message: code.as_str().to_string(),
        }
    }

    /// Build a failure with an explicit message.
    #[must_use]
    pub fn with_message(code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Per-capability change failure.
///
/// The carried capability/instance pair may legitimately differ from the
/// requested one when a handler delegates the change to a sibling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{capability}:{instance} {code}: {message}")]
pub struct ActionError {
    /// Capability the failure is attributed to.
    pub capability: CapabilityType,
    /// Instance the failure is attributed to.
    pub instance: String,
    /// Protocol error code.
    pub code: ActionErrorCode,
    /// Human-readable detail, defaults to the wire code.
    pub message: String,
}

impl ActionError {
    /// Build a failure carrying the code's wire string as its message.
    #[must_use]
    pub fn new(capability: CapabilityType, instance: impl Into<String>, code: ActionErrorCode) -> Self {
        Self {
            capability,
            instance: instance.into(),
            code,
            message: code.as_str().to_string(),
        }
    }

    /// Build a failure with an explicit message.
    #[must_use]
    pub fn with_message(
        capability: CapabilityType,
        instance: impl Into<String>,
        code: ActionErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            capability,
            instance: instance.into(),
            code,
            message: message.into(),
        }
    }
}

/// The assistant's callback endpoint rejected a notification push.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "notification rejected ({}): {}",
    .code.as_deref().unwrap_or("unknown"),
    .message.as_deref().unwrap_or("no message")
)]
pub struct NotifyError {
    /// Request id echoed by the endpoint, when present.
    pub request_id: Option<String>,
    /// Endpoint error code, when present.
    pub code: Option<String>,
    /// Endpoint error message, when present.
    pub message: Option<String>,
}

/// Construction-time validation failure.
///
/// Fatal to building the capability, property, or device at hand; a
/// malformed facet must never be registered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Unit attached to an instance that does not measure in it.
    #[error("unit {unit} is not supported for instance {instance}")]
    UnitMismatch { unit: String, instance: String },

    /// Percentage-like instance configured below zero.
    #[error("minimum value for {instance} cannot be less than 0 (got {min})")]
    NegativeMinimum { instance: String, min: f64 },

    /// Percentage-like instance configured above one hundred.
    #[error("maximum value for {instance} cannot be greater than 100 (got {max})")]
    ExcessiveMaximum { instance: String, max: f64 },

    /// Lower bound above the upper bound.
    #[error("range bounds are inverted: min {min} > max {max}")]
    InvertedBounds { min: f64, max: f64 },

    /// Mode capability constructed with zero allowed modes.
    #[error("mode capability requires at least one allowed mode")]
    EmptyModes,

    /// Color setting constructed with neither a color model nor a
    /// temperature range.
    #[error("color setting requires a color model or a temperature range")]
    EmptyColorSetting,

    /// Two capabilities collide on the same `(type, instance)` key.
    #[error("duplicate capability {type_id}:{instance}")]
    DuplicateCapability { type_id: String, instance: String },

    /// Two devices registered under the same id.
    #[error("duplicate device id {id}")]
    DuplicateDevice { id: String },

    /// Two properties collide on the same `(type, instance)` key.
    #[error("duplicate property {type_id}:{instance}")]
    DuplicateProperty { type_id: String, instance: String },

    /// A property that cannot be queried must at least be reportable.
    #[error("property {instance} is neither retrievable nor reportable")]
    UnreportableProperty { instance: String },

    /// Assigned value below the instance's minimum.
    #[error("{instance} cannot be less than {min} (got {value})")]
    BelowMinimum { instance: String, min: f64, value: f64 },

    /// Assigned value above the instance's maximum.
    #[error("{instance} cannot be greater than {max} (got {value})")]
    AboveMaximum { instance: String, max: f64, value: f64 },

    /// Assigned value must be strictly positive.
    #[error("{instance} must be positive (got {value})")]
    NotPositive { instance: String, value: f64 },

    /// Assigned temperature below absolute zero for the configured unit.
    #[error("temperature cannot be below absolute zero (got {value} {unit})")]
    BelowAbsoluteZero { unit: String, value: f64 },

    /// Event value outside the instance's enumerated set.
    #[error("event value {value} is not valid for instance {instance}")]
    UnknownEventValue { instance: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_query_code_as_wire_string() {
        let json = serde_json::to_string(&QueryErrorCode::DeviceUnreachable).unwrap();
        assert_eq!(json, "\"DEVICE_UNREACHABLE\"");
    }

    #[test]
    fn should_serialize_action_code_as_wire_string() {
        let json = serde_json::to_string(&ActionErrorCode::NotSupportedInCurrentMode).unwrap();
        assert_eq!(json, "\"NOT_SUPPORTED_IN_CURRENT_MODE\"");
    }

    #[test]
    fn should_default_query_message_to_wire_code() {
        let err = QueryError::new(QueryErrorCode::DeviceBusy);
        assert_eq!(err.message, "DEVICE_BUSY");
    }

    #[test]
    fn should_default_action_message_to_wire_code() {
        let err = ActionError::new(
            CapabilityType::OnOff,
            "on",
            ActionErrorCode::NotSupportedInCurrentMode,
        );
        assert_eq!(err.message, "NOT_SUPPORTED_IN_CURRENT_MODE");
        assert_eq!(err.instance, "on");
    }

    #[test]
    fn should_display_validation_error_detail() {
        let err = ValidationError::NegativeMinimum {
            instance: "humidity".to_string(),
            min: -5.0,
        };
        assert_eq!(
            err.to_string(),
            "minimum value for humidity cannot be less than 0 (got -5)"
        );
    }
}
