//! End-to-end engine tests over an in-memory bus and a recording notifier.
//!
//! Exercises the same wiring `main` performs, minus the real MQTT
//! connection and the real callback endpoint: hardware messages flow in
//! through bus callbacks, facade calls flow out as JSON envelopes, and the
//! notification loop pushes diffs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use homelink_adapter_devices::{climate, dimmer};
use homelink_app::notification_loop::NotificationLoop;
use homelink_app::ports::{ChangeNotifier, MessageBus, TopicCallback, TopicMessage};
use homelink_app::registry::DeviceRegistry;
use homelink_app::service::{ActionRequest, ActionTarget, QueryRequest, QueryTarget, SmartHome};
use homelink_domain::device::{CapabilityChange, CapabilityChangeState, DeviceReport};
use homelink_domain::error::NotifyError;
use homelink_domain::id::DeviceId;

// ── In-memory bus ──────────────────────────────────────────────

#[derive(Default)]
struct InMemoryBus {
    subscriptions: Mutex<HashMap<String, Vec<TopicCallback>>>,
    published: Mutex<Vec<(String, String)>>,
}

impl InMemoryBus {
    async fn deliver(&self, topic: &str, payload: &str) {
        let callbacks = self
            .subscriptions
            .lock()
            .unwrap()
            .get(topic)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            callback(TopicMessage {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
            .await
            .unwrap();
        }
    }

    fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

impl MessageBus for InMemoryBus {
    fn subscribe(&self, topic: &str, callback: TopicCallback) {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(topic.to_string())
            .or_default()
            .push(callback);
    }

    fn publish(&self, topic: &str, payload: &str) -> impl Future<Output = anyhow::Result<()>> + Send {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        async { Ok(()) }
    }
}

// ── Recording notifier ─────────────────────────────────────────

#[derive(Default)]
struct RecordingNotifier {
    pushes: Mutex<Vec<Vec<DeviceReport>>>,
}

impl ChangeNotifier for RecordingNotifier {
    fn notify_state(
        &self,
        devices: Vec<DeviceReport>,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send {
        self.pushes.lock().unwrap().push(devices);
        async { Ok(()) }
    }

    fn notify_discovery(&self) -> impl Future<Output = Result<(), NotifyError>> + Send {
        async { Ok(()) }
    }
}

// ── Fixture ────────────────────────────────────────────────────

struct Bridge {
    bus: Arc<InMemoryBus>,
    facade: SmartHome,
    registry: Arc<DeviceRegistry>,
}

fn bridge() -> Bridge {
    let bus = Arc::new(InMemoryBus::default());

    let mut registry = DeviceRegistry::new();
    registry
        .register(
            dimmer::build(
                Arc::clone(&bus),
                dimmer::DimmerArgs {
                    device_id: "lamp1".to_string(),
                    name: "Desk lamp".to_string(),
                    room: Some("study".to_string()),
                    status_topic: "/devices/dimmer1/state".to_string(),
                    control_topic: "/devices/dimmer1/on".to_string(),
                    range_off: 0,
                    range_low: 200,
                    range_high: 1000,
                },
            )
            .unwrap(),
        )
        .unwrap();
    registry
        .register(
            climate::build(
                Arc::clone(&bus),
                climate::ClimateArgs {
                    device_id: "sensor1".to_string(),
                    name: "Bedroom sensor".to_string(),
                    room: Some("bedroom".to_string()),
                    temperature_topic: "/devices/msw1/temperature".to_string(),
                    humidity_topic: "/devices/msw1/humidity".to_string(),
                    motion_topic: None,
                    stale_after_secs: None,
                },
            )
            .unwrap(),
        )
        .unwrap();

    let registry = Arc::new(registry);
    Bridge {
        bus,
        facade: SmartHome::new(Arc::clone(&registry)),
        registry,
    }
}

fn query(id: &str) -> QueryRequest {
    QueryRequest {
        devices: vec![QueryTarget {
            id: DeviceId::from(id),
        }],
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_all_registered_devices() {
    let bridge = bridge();
    let payload = bridge.facade.list_devices("user-1");
    let json = serde_json::to_value(&payload).unwrap();

    assert_eq!(json["user_id"], "user-1");
    let devices = json["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["id"], "lamp1");
    assert_eq!(devices[0]["type"], "devices.types.light");
    assert_eq!(devices[0]["room"], "study");
    assert_eq!(devices[1]["id"], "sensor1");
    assert_eq!(devices[1]["type"], "devices.types.sensor");
}

#[tokio::test]
async fn should_answer_query_with_hardware_observed_state() {
    let bridge = bridge();
    bridge.bus.deliver("/devices/dimmer1/state", "600").await;
    bridge.bus.deliver("/devices/msw1/temperature", "21.5").await;

    let payload = bridge.facade.query(&QueryRequest {
        devices: vec![
            QueryTarget {
                id: DeviceId::from("lamp1"),
            },
            QueryTarget {
                id: DeviceId::from("sensor1"),
            },
        ],
    });
    let json = serde_json::to_value(&payload).unwrap();

    let lamp = &json["devices"][0];
    assert_eq!(lamp["id"], "lamp1");
    assert!(lamp["capabilities"].as_array().unwrap().iter().any(|record| {
        record["type"] == "devices.capabilities.range"
            && record["state"]["value"] == serde_json::json!(50.0)
    }));

    let sensor = &json["devices"][1];
    assert!(sensor["properties"].as_array().unwrap().iter().any(|record| {
        record["state"]["instance"] == "temperature"
            && record["state"]["value"] == serde_json::json!(21.5)
    }));
}

#[tokio::test]
async fn should_synthesize_not_found_for_unknown_device() {
    let bridge = bridge();
    let payload = bridge.facade.query(&query("ghost"));
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["devices"][0]["error_code"], "DEVICE_NOT_FOUND");
}

#[tokio::test]
async fn should_forward_action_to_hardware_bus() {
    let bridge = bridge();
    let payload = bridge
        .facade
        .act(ActionRequest {
            devices: vec![ActionTarget {
                id: DeviceId::from("lamp1"),
                capabilities: vec![CapabilityChange {
                    type_id: "devices.capabilities.range".to_string(),
                    state: CapabilityChangeState {
                        instance: "brightness".to_string(),
                        value: serde_json::json!(75.0),
                        relative: false,
                    },
                }],
                custom_data: None,
            }],
        })
        .await;

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(
        json["devices"][0]["capabilities"][0]["state"]["action_result"]["status"],
        "DONE"
    );
    // 75% of the 200..1000 range.
    assert_eq!(
        bridge.bus.published(),
        vec![("/devices/dimmer1/on".to_string(), "800".to_string())]
    );
}

#[tokio::test]
async fn should_keep_partial_results_for_mixed_action() {
    let bridge = bridge();
    let payload = bridge
        .facade
        .act(ActionRequest {
            devices: vec![ActionTarget {
                id: DeviceId::from("lamp1"),
                capabilities: vec![
                    CapabilityChange {
                        type_id: "devices.capabilities.range".to_string(),
                        state: CapabilityChangeState {
                            instance: "brightness".to_string(),
                            value: serde_json::json!(30.0),
                            relative: false,
                        },
                    },
                    CapabilityChange {
                        type_id: "devices.capabilities.mode".to_string(),
                        state: CapabilityChangeState {
                            instance: "unknown".to_string(),
                            value: serde_json::json!("auto"),
                            relative: false,
                        },
                    },
                ],
                custom_data: None,
            }],
        })
        .await;

    let json = serde_json::to_value(&payload).unwrap();
    let entries = json["devices"][0]["capabilities"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let statuses: Vec<&str> = entries
        .iter()
        .map(|entry| entry["state"]["action_result"]["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"DONE"));
    assert!(statuses.contains(&"ERROR"));
    let error_entry = entries
        .iter()
        .find(|entry| entry["state"]["action_result"]["status"] == "ERROR")
        .unwrap();
    assert_eq!(
        error_entry["state"]["action_result"]["error_code"],
        "INVALID_ACTION"
    );
}

#[tokio::test]
async fn should_push_diff_cycle_over_reportable_facets() {
    let bridge = bridge();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut looper = NotificationLoop::new(Arc::clone(&bridge.registry), Arc::clone(&notifier));

    // First observation: both lamp records appear.
    bridge.bus.deliver("/devices/dimmer1/state", "600").await;
    looper.cycle().await;

    // Temperature changes; the lamp is unchanged and must be omitted.
    bridge.bus.deliver("/devices/msw1/temperature", "23.0").await;
    looper.cycle().await;

    let pushes = notifier.pushes.lock().unwrap();
    assert_eq!(pushes.len(), 2);

    let first: Vec<&str> = pushes[0].iter().map(|d| d.id.as_str()).collect();
    assert_eq!(first, vec!["lamp1"]);

    let second = &pushes[1];
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id.as_str(), "sensor1");
    assert_eq!(second[0].properties.len(), 1);
    assert_eq!(second[0].properties[0].state.instance, "temperature");
}

#[tokio::test]
async fn should_round_trip_action_status_and_diff() {
    let bridge = bridge();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut looper = NotificationLoop::new(Arc::clone(&bridge.registry), Arc::clone(&notifier));

    // Assistant sets brightness; hardware confirms on the status topic;
    // the next cycle pushes the confirmed value.
    bridge
        .facade
        .act(ActionRequest {
            devices: vec![ActionTarget {
                id: DeviceId::from("lamp1"),
                capabilities: vec![CapabilityChange {
                    type_id: "devices.capabilities.range".to_string(),
                    state: CapabilityChangeState {
                        instance: "brightness".to_string(),
                        value: serde_json::json!(50.0),
                        relative: false,
                    },
                }],
                custom_data: None,
            }],
        })
        .await;

    let (topic, raw) = bridge.bus.published().pop().unwrap();
    assert_eq!(topic, "/devices/dimmer1/on");
    bridge.bus.deliver("/devices/dimmer1/state", &raw).await;

    looper.cycle().await;

    let pushes = notifier.pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    let lamp = &pushes[0][0];
    assert_eq!(lamp.id.as_str(), "lamp1");
    assert!(
        lamp.capabilities
            .iter()
            .any(|record| record.state.instance == "brightness")
    );
}
