//! Properties — read-mostly telemetry facets of a device.
//!
//! Unlike capabilities, properties have no change handler: their values are
//! only ever written by hardware-driven callbacks, and subtypes enforce the
//! physical invariants of each instance at assignment time. A property that
//! cannot be queried must at least be reportable — there is no point in
//! telemetry nobody can observe. (Capabilities deliberately do not carry
//! this restriction.)

mod event;
mod float;

pub use event::{Event, EventInstance, EventValue};
pub use float::{Float, FloatInstance, FloatUnit};

use serde::{Deserialize, Serialize};

use crate::capability::StateRecord;
use crate::error::QueryError;

/// Property kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "devices.properties.float")]
    Float,
    #[serde(rename = "devices.properties.event")]
    Event,
}

impl PropertyType {
    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "devices.properties.float",
            Self::Event => "devices.properties.event",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specification record for one property:
/// `{type, retrievable, reportable, parameters}`.
#[derive(Debug, Clone, Serialize)]
pub struct PropertySpecification {
    #[serde(rename = "type")]
    pub type_id: PropertyType,
    pub retrievable: bool,
    pub reportable: bool,
    pub parameters: PropertyParameters,
}

/// Kind-specific parameter payloads, flattened on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PropertyParameters {
    Float(float::FloatParameters),
    Event(event::EventParameters),
}

/// A telemetry facet of either kind.
///
/// Clones share the observed-value cell with the structs they were built
/// from, just like capabilities.
#[derive(Debug, Clone)]
pub enum Property {
    Float(Float),
    Event(Event),
}

impl Property {
    /// Kind tag of this property.
    #[must_use]
    pub fn type_id(&self) -> PropertyType {
        match self {
            Self::Float(_) => PropertyType::Float,
            Self::Event(_) => PropertyType::Event,
        }
    }

    /// The single instance name of this property.
    #[must_use]
    pub fn instance(&self) -> &'static str {
        match self {
            Self::Float(prop) => prop.instance().as_str(),
            Self::Event(prop) => prop.instance().as_str(),
        }
    }

    /// Whether this property can be queried.
    #[must_use]
    pub fn retrievable(&self) -> bool {
        match self {
            Self::Float(prop) => prop.is_retrievable(),
            Self::Event(prop) => prop.is_retrievable(),
        }
    }

    /// Whether a value change should be pushed out of band.
    #[must_use]
    pub fn reportable(&self) -> bool {
        match self {
            Self::Float(prop) => prop.is_reportable(),
            Self::Event(prop) => prop.is_reportable(),
        }
    }

    /// Specification record for device listing.
    #[must_use]
    pub fn specification(&self) -> PropertySpecification {
        match self {
            Self::Float(prop) => prop.specification(),
            Self::Event(prop) => prop.specification(),
        }
    }

    /// Current state record for the query path.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    ///
    /// # Panics
    ///
    /// Panics when called on a non-retrievable property.
    pub fn state(&self) -> Result<Option<StateRecord>, QueryError> {
        assert!(
            self.retrievable(),
            "state() queried on non-retrievable property {}",
            self.type_id()
        );
        self.current()
    }

    /// Current state record without the retrievable gate, for the report
    /// path.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    pub fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        match self {
            Self::Float(prop) => prop.current(),
            Self::Event(prop) => prop.current(),
        }
    }
}

impl From<Float> for Property {
    fn from(prop: Float) -> Self {
        Self::Float(prop)
    }
}

impl From<Event> for Property {
    fn from(prop: Event) -> Self {
        Self::Event(prop)
    }
}

impl StateRecord {
    /// Build a record for a property kind.
    #[must_use]
    pub fn property(
        type_id: PropertyType,
        instance: impl Into<String>,
        value: crate::capability::StateValue,
    ) -> Self {
        Self {
            type_id: type_id.as_str().to_string(),
            state: crate::capability::InstanceValue {
                instance: instance.into(),
                value,
            },
        }
    }
}
