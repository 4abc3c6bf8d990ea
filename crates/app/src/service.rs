//! Smart-home facade — the JSON-envelope surface a web layer calls.
//!
//! HTTP routing, sessions, and authentication live outside this crate; the
//! caller hands over an already-authenticated user id and the deserialized
//! request payloads, and gets back the payload halves of the protocol's
//! responses.

use std::sync::Arc;

use futures::future;
use serde::{Deserialize, Serialize};

use homelink_domain::device::{
    CapabilityChange, DeviceActionResult, DeviceSpecification, DeviceState,
};
use homelink_domain::error::QueryErrorCode;
use homelink_domain::id::DeviceId;

use crate::registry::DeviceRegistry;

/// Payload of the device-list response.
#[derive(Debug, Serialize)]
pub struct DeviceListPayload {
    pub user_id: String,
    pub devices: Vec<DeviceSpecification>,
}

/// Query request payload: which devices to read.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub devices: Vec<QueryTarget>,
}

/// One queried device.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryTarget {
    pub id: DeviceId,
}

/// Payload of the query response.
#[derive(Debug, Serialize)]
pub struct QueryPayload {
    pub devices: Vec<DeviceState>,
}

/// Action request payload: per-device capability changes.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub devices: Vec<ActionTarget>,
}

/// One device's requested changes.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionTarget {
    pub id: DeviceId,
    pub capabilities: Vec<CapabilityChange>,
    #[serde(default)]
    pub custom_data: Option<serde_json::Value>,
}

/// One device's entry in the action response: either its per-capability
/// results or a device-level error.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    Ready(DeviceActionResult),
    Failed {
        id: DeviceId,
        error_code: QueryErrorCode,
        error_message: String,
    },
}

/// Payload of the action response.
#[derive(Debug, Serialize)]
pub struct ActionPayload {
    pub devices: Vec<ActionOutcome>,
}

/// The engine operations behind the platform's three smart-home calls.
#[derive(Debug, Clone)]
pub struct SmartHome {
    registry: Arc<DeviceRegistry>,
}

impl SmartHome {
    /// Create the facade over a built registry.
    #[must_use]
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this facade serves.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Device-list call: every registered device's specification.
    #[must_use]
    pub fn list_devices(&self, user_id: &str) -> DeviceListPayload {
        DeviceListPayload {
            user_id: user_id.to_string(),
            devices: self.registry.iter().map(|device| device.specification()).collect(),
        }
    }

    /// Query call: current state per requested device. Unknown ids produce
    /// a synthesized `DEVICE_NOT_FOUND` envelope instead of an error.
    #[must_use]
    pub fn query(&self, request: &QueryRequest) -> QueryPayload {
        let devices = request
            .devices
            .iter()
            .map(|target| match self.registry.get(&target.id) {
                Some(device) => device.state(),
                None => DeviceState::Failed {
                    id: target.id.clone(),
                    error_code: QueryErrorCode::DeviceNotFound,
                    error_message: "unknown device".to_string(),
                },
            })
            .collect();
        QueryPayload { devices }
    }

    /// Action call: dispatch every device's changes; devices run
    /// concurrently and unknown ids synthesize `DEVICE_NOT_FOUND` entries.
    pub async fn act(&self, request: ActionRequest) -> ActionPayload {
        let units = request.devices.into_iter().map(|target| {
            let device = self.registry.get(&target.id).cloned();
            async move {
                match device {
                    Some(device) => ActionOutcome::Ready(
                        device.action(&target.capabilities, target.custom_data).await,
                    ),
                    None => ActionOutcome::Failed {
                        id: target.id,
                        error_code: QueryErrorCode::DeviceNotFound,
                        error_message: "unknown device".to_string(),
                    },
                }
            }
        });
        ActionPayload {
            devices: future::join_all(units).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelink_domain::capability::OnOff;
    use homelink_domain::device::{CapabilityChangeState, DeviceKind};
    use homelink_domain::device::Device;

    fn registry_with_switch() -> Arc<DeviceRegistry> {
        let onoff = OnOff::new().retrievable(true).with_initial(true);
        let device = Device::builder("switch1", DeviceKind::Switch)
            .name("Test switch")
            .capability(onoff)
            .build()
            .unwrap();
        let mut registry = DeviceRegistry::new();
        registry.register(device).unwrap();
        Arc::new(registry)
    }

    #[test]
    fn should_list_every_device_specification() {
        let facade = SmartHome::new(registry_with_switch());
        let payload = facade.list_devices("user-1");
        assert_eq!(payload.user_id, "user-1");
        assert_eq!(payload.devices.len(), 1);
        assert_eq!(payload.devices[0].id.as_str(), "switch1");
    }

    #[test]
    fn should_query_known_device_state() {
        let facade = SmartHome::new(registry_with_switch());
        let payload = facade.query(&QueryRequest {
            devices: vec![QueryTarget {
                id: DeviceId::from("switch1"),
            }],
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json["devices"][0]["capabilities"][0]["state"]["value"],
            serde_json::json!(true)
        );
    }

    #[test]
    fn should_synthesize_not_found_for_unknown_query_id() {
        let facade = SmartHome::new(registry_with_switch());
        let payload = facade.query(&QueryRequest {
            devices: vec![QueryTarget {
                id: DeviceId::from("ghost"),
            }],
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json["devices"][0],
            serde_json::json!({
                "id": "ghost",
                "error_code": "DEVICE_NOT_FOUND",
                "error_message": "unknown device",
            })
        );
    }

    #[tokio::test]
    async fn should_synthesize_not_found_for_unknown_action_id() {
        let facade = SmartHome::new(registry_with_switch());
        let payload = facade
            .act(ActionRequest {
                devices: vec![ActionTarget {
                    id: DeviceId::from("ghost"),
                    capabilities: vec![],
                    custom_data: None,
                }],
            })
            .await;
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["devices"][0]["error_code"], "DEVICE_NOT_FOUND");
    }

    #[tokio::test]
    async fn should_dispatch_action_to_known_device() {
        let facade = SmartHome::new(registry_with_switch());
        let payload = facade
            .act(ActionRequest {
                devices: vec![ActionTarget {
                    id: DeviceId::from("switch1"),
                    capabilities: vec![CapabilityChange {
                        type_id: "devices.capabilities.on_off".to_string(),
                        state: CapabilityChangeState {
                            instance: "on".to_string(),
                            value: serde_json::json!(false),
                            relative: false,
                        },
                    }],
                    custom_data: None,
                }],
            })
            .await;
        let json = serde_json::to_value(&payload).unwrap();
        // No handler installed: the entry reports the unsupported-write default.
        assert_eq!(
            json["devices"][0]["capabilities"][0]["state"]["action_result"]["error_code"],
            "NOT_SUPPORTED_IN_CURRENT_MODE"
        );
    }
}
