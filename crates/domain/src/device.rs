//! Device — aggregates capabilities and properties under one identity.
//!
//! Devices are constructed once at startup from configuration and live for
//! the process lifetime. The aggregate itself holds no external resources;
//! bus subscriptions and background tasks belong to the driver that built it.

use std::collections::BTreeMap;

use futures::future;
use serde::{Deserialize, Serialize};

use crate::capability::{
    Capability, CapabilitySpecification, CapabilityType, ChangeFuture, ChangeOptions, StateRecord,
};
use crate::error::{ActionError, ActionErrorCode, QueryError, QueryErrorCode, ValidationError};
use crate::id::DeviceId;
use crate::property::{Property, PropertySpecification};

/// Static registry of device kinds and their wire tags.
///
/// Replaces per-kind subclassing: a kind contributes nothing but its tag,
/// and any device may carry any capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "devices.types.light")]
    Light,
    #[serde(rename = "devices.types.socket")]
    Socket,
    #[serde(rename = "devices.types.switch")]
    Switch,
    #[serde(rename = "devices.types.thermostat")]
    Thermostat,
    #[serde(rename = "devices.types.thermostat.ac")]
    AirConditioner,
    #[serde(rename = "devices.types.media_device")]
    MediaDevice,
    #[serde(rename = "devices.types.media_device.tv")]
    Tv,
    #[serde(rename = "devices.types.cooking")]
    Cooking,
    #[serde(rename = "devices.types.cooking.coffee_maker")]
    CoffeeMaker,
    #[serde(rename = "devices.types.cooking.kettle")]
    Kettle,
    #[serde(rename = "devices.types.openable")]
    Openable,
    #[serde(rename = "devices.types.openable.curtain")]
    Curtain,
    #[serde(rename = "devices.types.humidifier")]
    Humidifier,
    #[serde(rename = "devices.types.purifier")]
    Purifier,
    #[serde(rename = "devices.types.vacuum_cleaner")]
    VacuumCleaner,
    #[serde(rename = "devices.types.sensor")]
    Sensor,
    #[serde(rename = "devices.types.other")]
    Other,
}

impl DeviceKind {
    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "devices.types.light",
            Self::Socket => "devices.types.socket",
            Self::Switch => "devices.types.switch",
            Self::Thermostat => "devices.types.thermostat",
            Self::AirConditioner => "devices.types.thermostat.ac",
            Self::MediaDevice => "devices.types.media_device",
            Self::Tv => "devices.types.media_device.tv",
            Self::Cooking => "devices.types.cooking",
            Self::CoffeeMaker => "devices.types.cooking.coffee_maker",
            Self::Kettle => "devices.types.cooking.kettle",
            Self::Openable => "devices.types.openable",
            Self::Curtain => "devices.types.openable.curtain",
            Self::Humidifier => "devices.types.humidifier",
            Self::Purifier => "devices.types.purifier",
            Self::VacuumCleaner => "devices.types.vacuum_cleaner",
            Self::Sensor => "devices.types.sensor",
            Self::Other => "devices.types.other",
        }
    }
}

/// Optional manufacturer block of the specification envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    fn is_empty(&self) -> bool {
        self.manufacturer.is_none()
            && self.model.is_none()
            && self.hw_version.is_none()
            && self.sw_version.is_none()
    }
}

/// Specification envelope for one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSpecification {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    pub capabilities: Vec<CapabilitySpecification>,
    pub properties: Vec<PropertySpecification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

/// Query envelope for one device: either the retrievable state records or a
/// device-level error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeviceState {
    Ready {
        id: DeviceId,
        capabilities: Vec<StateRecord>,
        properties: Vec<StateRecord>,
    },
    Failed {
        id: DeviceId,
        error_code: QueryErrorCode,
        error_message: String,
    },
}

impl DeviceState {
    /// Build the error envelope for a failed device query.
    #[must_use]
    pub fn failed(id: DeviceId, error: &QueryError) -> Self {
        Self::Failed {
            id,
            error_code: error.code,
            error_message: error.message.clone(),
        }
    }
}

/// Snapshot of every reportable facet with a known value; input to the
/// notification loop's diff and the per-device unit of the push payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub id: DeviceId,
    pub capabilities: Vec<StateRecord>,
    pub properties: Vec<StateRecord>,
}

impl DeviceReport {
    /// Whether the report carries no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty() && self.properties.is_empty()
    }
}

/// One requested capability change, as received from the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityChange {
    /// Raw capability type tag; echoed back verbatim for unknown kinds.
    #[serde(rename = "type")]
    pub type_id: String,
    pub state: CapabilityChangeState,
}

/// The `state` half of a [`CapabilityChange`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityChangeState {
    pub instance: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub relative: bool,
}

/// `DONE` / `ERROR` marker of one action-result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Done,
    Error,
}

/// The `action_result` block of one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ActionErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One `{type, state: {instance, action_result}}` entry of the action
/// envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResultRecord {
    #[serde(rename = "type")]
    pub type_id: String,
    pub state: InstanceActionResult,
}

/// The `state` half of an [`ActionResultRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceActionResult {
    pub instance: String,
    pub action_result: ActionResult,
}

impl ActionResultRecord {
    fn done(capability: CapabilityType, instance: String) -> Self {
        Self {
            type_id: capability.as_str().to_string(),
            state: InstanceActionResult {
                instance,
                action_result: ActionResult {
                    status: ActionStatus::Done,
                    error_code: None,
                    error_message: None,
                },
            },
        }
    }

    fn error(error: ActionError) -> Self {
        Self {
            type_id: error.capability.as_str().to_string(),
            state: InstanceActionResult {
                instance: error.instance,
                action_result: ActionResult {
                    status: ActionStatus::Error,
                    error_code: Some(error.code),
                    error_message: Some(error.message),
                },
            },
        }
    }

    fn unknown_key(type_id: &str, instance: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            state: InstanceActionResult {
                instance: instance.to_string(),
                action_result: ActionResult {
                    status: ActionStatus::Error,
                    error_code: Some(ActionErrorCode::InvalidAction),
                    error_message: Some("unknown capability for this device".to_string()),
                },
            },
        }
    }
}

/// Action envelope for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceActionResult {
    pub id: DeviceId,
    pub capabilities: Vec<ActionResultRecord>,
}

/// A physical or virtual device exposed to the assistant platform.
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    kind: DeviceKind,
    name: Option<String>,
    description: Option<String>,
    room: Option<String>,
    custom_data: Option<serde_json::Value>,
    info: DeviceInfo,
    capabilities: Vec<Capability>,
    cap_index: BTreeMap<(CapabilityType, String), usize>,
    properties: Vec<Property>,
}

/// Builder for [`Device`]; duplicate `(type, instance)` keys are rejected at
/// [`build`](DeviceBuilder::build) time as configuration errors.
#[derive(Debug)]
pub struct DeviceBuilder {
    id: DeviceId,
    kind: DeviceKind,
    name: Option<String>,
    description: Option<String>,
    room: Option<String>,
    custom_data: Option<serde_json::Value>,
    info: DeviceInfo,
    capabilities: Vec<Capability>,
    properties: Vec<Property>,
}

impl Device {
    /// Start building a device.
    #[must_use]
    pub fn builder(id: impl Into<DeviceId>, kind: DeviceKind) -> DeviceBuilder {
        DeviceBuilder {
            id: id.into(),
            kind,
            name: None,
            description: None,
            room: None,
            custom_data: None,
            info: DeviceInfo::default(),
            capabilities: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Stable device identifier.
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Device kind tag.
    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Distinct capabilities, in registration order.
    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Distinct properties, in registration order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Look up a capability by its `(type, instance)` key.
    #[must_use]
    pub fn capability(&self, type_id: CapabilityType, instance: &str) -> Option<&Capability> {
        self.cap_index
            .get(&(type_id, instance.to_string()))
            .map(|&index| &self.capabilities[index])
    }

    /// Specification envelope: identity, present-only metadata, and every
    /// facet's specification.
    #[must_use]
    pub fn specification(&self) -> DeviceSpecification {
        DeviceSpecification {
            id: self.id.clone(),
            kind: self.kind,
            capabilities: self.capabilities.iter().map(Capability::specification).collect(),
            properties: self.properties.iter().map(Property::specification).collect(),
            name: self.name.clone(),
            description: self.description.clone(),
            room: self.room.clone(),
            custom_data: self.custom_data.clone(),
            device_info: (!self.info.is_empty()).then(|| self.info.clone()),
        }
    }

    /// Query envelope over the retrievable facets.
    ///
    /// All-or-nothing at device granularity: the first facet to raise a
    /// query fault turns the whole envelope into an error, with no partial
    /// arrays — unlike the per-capability containment of
    /// [`action`](Self::action).
    #[must_use]
    pub fn state(&self) -> DeviceState {
        let mut capabilities = Vec::new();
        for cap in self.capabilities.iter().filter(|cap| cap.retrievable()) {
            match cap.state() {
                Ok(Some(record)) => capabilities.push(record),
                Ok(None) => {}
                Err(err) => return DeviceState::failed(self.id.clone(), &err),
            }
        }

        let mut properties = Vec::new();
        for prop in self.properties.iter().filter(|prop| prop.retrievable()) {
            match prop.state() {
                Ok(Some(record)) => properties.push(record),
                Ok(None) => {}
                Err(err) => return DeviceState::failed(self.id.clone(), &err),
            }
        }

        DeviceState::Ready {
            id: self.id.clone(),
            capabilities,
            properties,
        }
    }

    /// Snapshot of every reportable facet with a known value, bypassing the
    /// retrievable gate. Input to the notification loop's diff.
    ///
    /// # Errors
    ///
    /// Propagates the first query fault; the caller skips this device for
    /// the current cycle.
    pub fn report(&self) -> Result<DeviceReport, QueryError> {
        let mut capabilities = Vec::new();
        for cap in self.capabilities.iter().filter(|cap| cap.reportable()) {
            if let Some(record) = cap.current()? {
                capabilities.push(record);
            }
        }

        let mut properties = Vec::new();
        for prop in self.properties.iter().filter(|prop| prop.reportable()) {
            if let Some(record) = prop.current()? {
                properties.push(record);
            }
        }

        Ok(DeviceReport {
            id: self.id.clone(),
            capabilities,
            properties,
        })
    }

    /// Apply a batch of capability changes.
    ///
    /// Unknown `(type, instance)` keys are answered with synthesized
    /// `INVALID_ACTION` entries and never reach a handler. Known requests
    /// dispatch concurrently; every unit runs to its own conclusion and a
    /// failing handler never aborts its siblings. Two requests targeting the
    /// same key in one call are dispatched as-is — the final value depends
    /// on completion order, which is deliberately unspecified.
    pub async fn action(
        &self,
        changes: &[CapabilityChange],
        custom_data: Option<serde_json::Value>,
    ) -> DeviceActionResult {
        let mut entries = Vec::new();
        let mut pending: Vec<ChangeFuture> = Vec::new();

        for change in changes {
            let target = CapabilityType::from_wire(&change.type_id)
                .and_then(|type_id| self.capability(type_id, &change.state.instance));
            match target {
                Some(cap) => pending.push(cap.dispatch(
                    &change.state.instance,
                    &change.state.value,
                    ChangeOptions {
                        relative: change.state.relative,
                        custom_data: custom_data.clone(),
                    },
                )),
                None => entries.push(ActionResultRecord::unknown_key(
                    &change.type_id,
                    &change.state.instance,
                )),
            }
        }

        for outcome in future::join_all(pending).await {
            match outcome {
                Ok(applied) => {
                    entries.push(ActionResultRecord::done(applied.capability, applied.instance));
                }
                Err(error) => entries.push(ActionResultRecord::error(error)),
            }
        }

        DeviceActionResult {
            id: self.id.clone(),
            capabilities: entries,
        }
    }
}

impl DeviceBuilder {
    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the room.
    #[must_use]
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Attach the opaque per-device blob the platform echoes on actions.
    #[must_use]
    pub fn custom_data(mut self, custom_data: serde_json::Value) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    /// Set the manufacturer string.
    #[must_use]
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.info.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set the model string.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.info.model = Some(model.into());
        self
    }

    /// Set the hardware version string.
    #[must_use]
    pub fn hw_version(mut self, hw_version: impl Into<String>) -> Self {
        self.info.hw_version = Some(hw_version.into());
        self
    }

    /// Set the software version string.
    #[must_use]
    pub fn sw_version(mut self, sw_version: impl Into<String>) -> Self {
        self.info.sw_version = Some(sw_version.into());
        self
    }

    /// Add a capability.
    #[must_use]
    pub fn capability(mut self, capability: impl Into<Capability>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Add a property.
    #[must_use]
    pub fn property(mut self, property: impl Into<Property>) -> Self {
        self.properties.push(property.into());
        self
    }

    /// Validate and build the device.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateCapability`] or
    /// [`ValidationError::DuplicateProperty`] when two facets collide on the
    /// same `(type, instance)` key.
    pub fn build(self) -> Result<Device, ValidationError> {
        let mut cap_index = BTreeMap::new();
        for (index, capability) in self.capabilities.iter().enumerate() {
            for instance in capability.instances() {
                let key = (capability.type_id(), instance.to_string());
                if cap_index.insert(key, index).is_some() {
                    return Err(ValidationError::DuplicateCapability {
                        type_id: capability.type_id().as_str().to_string(),
                        instance: instance.to_string(),
                    });
                }
            }
        }

        let mut prop_keys = BTreeMap::new();
        for property in &self.properties {
            let key = (property.type_id(), property.instance());
            if prop_keys.insert(key, ()).is_some() {
                return Err(ValidationError::DuplicateProperty {
                    type_id: property.type_id().as_str().to_string(),
                    instance: property.instance().to_string(),
                });
            }
        }

        Ok(Device {
            id: self.id,
            kind: self.kind,
            name: self.name,
            description: self.description,
            room: self.room,
            custom_data: self.custom_data,
            info: self.info,
            capabilities: self.capabilities,
            cap_index,
            properties: self.properties,
        })
    }
}
