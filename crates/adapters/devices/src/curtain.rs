//! Curtain driven by a motor relay and a direction relay.
//!
//! The curtain reports no position of its own — only the state of its two
//! controls. Opening or closing is a timed motor pulse; a new change request
//! aborts any pulse still in flight and starts its own (last-request-wins,
//! never queued).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use serde::Deserialize;
use tokio::task::JoinHandle;

use homelink_app::ports::{MessageBus, TopicMessage};
use homelink_domain::capability::{
    Applied, CapabilityType, ChangeHandler, ChangeRequest, Mode, ModeInstance, ModeValue, OnOff,
    Range, RangeInstance, RangeUnit, Toggle, ToggleInstance,
};
use homelink_domain::device::{Device, DeviceKind};
use homelink_domain::error::{ActionError, ActionErrorCode, ValidationError};

/// Wiring arguments for one curtain.
#[derive(Debug, Clone, Deserialize)]
pub struct CurtainArgs {
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub room: Option<String>,
    /// Topic the direction relay reports on.
    pub direction_status_topic: String,
    /// Topic the motor relay reports on.
    pub motor_status_topic: String,
    /// Topic direction commands are published to.
    pub direction_control_topic: String,
    /// Topic motor commands are published to.
    pub motor_control_topic: String,
    /// Full travel time of the curtain in seconds.
    pub action_time_secs: u64,
}

type PulseSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

fn cancel_pulse(slot: &PulseSlot) {
    if let Some(task) = slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
    {
        task.abort();
    }
}

fn start_pulse<B>(bus: B, args: &CurtainArgs, slot: &PulseSlot, up: bool, duration: Duration)
where
    B: MessageBus + Clone + 'static,
{
    cancel_pulse(slot);
    let motor = args.motor_control_topic.clone();
    let direction = args.direction_control_topic.clone();
    let task = tokio::spawn(async move {
        let _ = bus.publish(&motor, "0").await;
        let _ = bus.publish(&direction, if up { "1" } else { "0" }).await;
        let _ = bus.publish(&motor, "1").await;
        tokio::time::sleep(duration).await;
        let _ = bus.publish(&motor, "0").await;
    });
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
}

/// Build the device and wire its topics to the given bus.
///
/// # Errors
///
/// Returns [`ValidationError`] when the capability configuration is invalid.
pub fn build<B>(bus: B, args: CurtainArgs) -> Result<Device, ValidationError>
where
    B: MessageBus + Clone + 'static,
{
    let mut updown = OnOff::new().split(true);
    let mut direction = Mode::new(ModeInstance::Swing, vec![ModeValue::High, ModeValue::Low])?
        .retrievable(true);
    let mut motor = Toggle::new(ToggleInstance::Oscillation)
        .retrievable(true)
        .reportable(true);
    let mut partial = Range::builder(RangeInstance::Open)
        .unit(RangeUnit::Percent)
        .random_access(false)
        .min_value(0.0)
        .max_value(100.0)
        .precision(5.0)
        .build()?;

    let pulse: PulseSlot = Arc::new(Mutex::new(None));
    let travel = Duration::from_secs(args.action_time_secs);

    let updown_handler = {
        let bus = bus.clone();
        let args = args.clone();
        let pulse = Arc::clone(&pulse);
        ChangeHandler::new(move |req: ChangeRequest<bool>| {
            tracing::info!(device = %args.device_id, up = req.value, "switching curtain");
            start_pulse(bus.clone(), &args, &pulse, req.value, travel);
            async move { Ok(Applied::new(CapabilityType::OnOff, req.instance)) }.boxed()
        })
    };
    updown.set_change_handler(updown_handler);

    let partial_handler = {
        let bus = bus.clone();
        let args = args.clone();
        let pulse = Arc::clone(&pulse);
        ChangeHandler::new(move |req: ChangeRequest<f64>| {
            if !(0.0..=100.0).contains(&req.value) {
                let err = ActionError::new(
                    CapabilityType::Range,
                    req.instance,
                    ActionErrorCode::InvalidValue,
                );
                return async move { Err(err) }.boxed();
            }
            let duration = travel.mul_f64(req.value / 100.0);
            tracing::info!(device = %args.device_id, percent = req.value, "partially opening curtain");
            start_pulse(bus.clone(), &args, &pulse, true, duration);
            async move { Ok(Applied::new(CapabilityType::Range, req.instance)) }.boxed()
        })
    };
    partial.set_change_handler(partial_handler);

    let motor_handler = {
        let bus = bus.clone();
        let topic = args.motor_control_topic.clone();
        ChangeHandler::new(move |req: ChangeRequest<bool>| {
            let bus = bus.clone();
            let topic = topic.clone();
            async move {
                bus.publish(&topic, if req.value { "1" } else { "0" })
                    .await
                    .map_err(|err| {
                        ActionError::with_message(
                            CapabilityType::Toggle,
                            req.instance.clone(),
                            ActionErrorCode::DeviceUnreachable,
                            err.to_string(),
                        )
                    })?;
                Ok(Applied::new(CapabilityType::Toggle, req.instance))
            }
            .boxed()
        })
    };
    motor.set_change_handler(motor_handler);

    let direction_handler = {
        let bus = bus.clone();
        let topic = args.direction_control_topic.clone();
        ChangeHandler::new(move |req: ChangeRequest<ModeValue>| {
            let bus = bus.clone();
            let topic = topic.clone();
            async move {
                let raw = if req.value == ModeValue::High { "1" } else { "0" };
                bus.publish(&topic, raw).await.map_err(|err| {
                    ActionError::with_message(
                        CapabilityType::Mode,
                        req.instance.clone(),
                        ActionErrorCode::DeviceUnreachable,
                        err.to_string(),
                    )
                })?;
                Ok(Applied::new(CapabilityType::Mode, req.instance))
            }
            .boxed()
        })
    };
    direction.set_change_handler(direction_handler);

    {
        let direction = direction.clone();
        bus.subscribe(
            &args.direction_status_topic,
            Arc::new(move |msg: TopicMessage| {
                let direction = direction.clone();
                async move {
                    direction.set(if msg.payload.trim() == "1" {
                        ModeValue::High
                    } else {
                        ModeValue::Low
                    });
                    Ok(())
                }
                .boxed()
            }),
        );
    }
    {
        let motor = motor.clone();
        bus.subscribe(
            &args.motor_status_topic,
            Arc::new(move |msg: TopicMessage| {
                let motor = motor.clone();
                async move {
                    motor.set(msg.payload.trim() == "1");
                    Ok(())
                }
                .boxed()
            }),
        );
    }

    let mut builder = Device::builder(args.device_id.clone(), DeviceKind::Curtain)
        .name(args.name.clone())
        .manufacturer("wirenboard")
        .model("curtain")
        .capability(updown)
        .capability(partial)
        .capability(direction)
        .capability(motor);
    if let Some(room) = &args.room {
        builder = builder.room(room.clone());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelink_app::ports::TopicCallback;
    use homelink_domain::device::{ActionStatus, CapabilityChange, CapabilityChangeState};
    use std::collections::HashMap;
    use std::future::Future;

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

    fn args() -> CurtainArgs {
        CurtainArgs {
            device_id: "curtain1".to_string(),
            name: "Living room curtain".to_string(),
            room: None,
            direction_status_topic: "/devices/curtain1/dir".to_string(),
            motor_status_topic: "/devices/curtain1/motor".to_string(),
            direction_control_topic: "/devices/curtain1/dir/on".to_string(),
            motor_control_topic: "/devices/curtain1/motor/on".to_string(),
            action_time_secs: 5,
        }
    }

    fn change(type_id: &str, instance: &str, value: serde_json::Value) -> CapabilityChange {
        CapabilityChange {
            type_id: type_id.to_string(),
            state: CapabilityChangeState {
                instance: instance.to_string(),
                value,
                relative: false,
            },
        }
    }

    #[tokio::test]
    async fn should_track_motor_and_direction_status() {
        let bus = Arc::new(InMemoryBus::default());
        let device = build(Arc::clone(&bus), args()).unwrap();

        bus.deliver("/devices/curtain1/motor", "1").await;
        bus.deliver("/devices/curtain1/dir", "0").await;

        let json = serde_json::to_value(device.state()).unwrap();
        let records = json["capabilities"].as_array().unwrap();
        assert!(records.iter().any(|record| {
            record["type"] == "devices.capabilities.toggle"
                && record["state"]["value"] == serde_json::json!(true)
        }));
        assert!(records.iter().any(|record| {
            record["type"] == "devices.capabilities.mode"
                && record["state"]["value"] == serde_json::json!("low")
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_full_motor_pulse_for_up_command() {
        let bus = Arc::new(InMemoryBus::default());
        let device = build(Arc::clone(&bus), args()).unwrap();

        let result = device
            .action(
                &[change("devices.capabilities.on_off", "on", serde_json::json!(true))],
                None,
            )
            .await;
        assert_eq!(
            result.capabilities[0].state.action_result.status,
            ActionStatus::Done
        );

        // Let the pulse task run to completion (time is paused and
        // auto-advances through the sleep).
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(
            bus.published(),
            vec![
                ("/devices/curtain1/motor/on".to_string(), "0".to_string()),
                ("/devices/curtain1/dir/on".to_string(), "1".to_string()),
                ("/devices/curtain1/motor/on".to_string(), "1".to_string()),
                ("/devices/curtain1/motor/on".to_string(), "0".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_replace_in_flight_pulse_with_newest_request() {
        let bus = Arc::new(InMemoryBus::default());
        let device = build(Arc::clone(&bus), args()).unwrap();

        // Two requests back-to-back: the first pulse task is aborted before
        // it ever runs, so only the second direction is published.
        device
            .action(
                &[change("devices.capabilities.on_off", "on", serde_json::json!(true))],
                None,
            )
            .await;
        device
            .action(
                &[change("devices.capabilities.on_off", "on", serde_json::json!(false))],
                None,
            )
            .await;

        tokio::time::sleep(Duration::from_secs(6)).await;

        let directions: Vec<String> = bus
            .published()
            .into_iter()
            .filter(|(topic, _)| topic == "/devices/curtain1/dir/on")
            .map(|(_, payload)| payload)
            .collect();
        assert_eq!(directions, vec!["0".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_scale_partial_open_pulse_by_percentage() {
        let bus = Arc::new(InMemoryBus::default());
        let device = build(Arc::clone(&bus), args()).unwrap();

        let before = tokio::time::Instant::now();
        device
            .action(
                &[change("devices.capabilities.range", "open", serde_json::json!(40.0))],
                None,
            )
            .await;
        // 40% of 5s travel = 2s pulse; after 3s the motor must be off again.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(before.elapsed() >= Duration::from_secs(3));

        let motor_commands: Vec<String> = bus
            .published()
            .into_iter()
            .filter(|(topic, _)| topic == "/devices/curtain1/motor/on")
            .map(|(_, payload)| payload)
            .collect();
        assert_eq!(
            motor_commands,
            vec!["0".to_string(), "1".to_string(), "0".to_string()]
        );
    }

    #[tokio::test]
    async fn should_publish_motor_toggle_directly() {
        let bus = Arc::new(InMemoryBus::default());
        let device = build(Arc::clone(&bus), args()).unwrap();

        device
            .action(
                &[change("devices.capabilities.toggle", "oscillation", serde_json::json!(true))],
                None,
            )
            .await;

        assert_eq!(
            bus.published(),
            vec![("/devices/curtain1/motor/on".to_string(), "1".to_string())]
        );
    }
}
