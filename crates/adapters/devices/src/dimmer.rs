//! Dimmable light over a raw dimmer channel.
//!
//! The hardware reports and accepts raw dimmer values in
//! `[range_off, range_high]`; the bridge exposes them as an on/off switch
//! plus a `[0, 100]` brightness range. Some dimmers have a dead zone below
//! `range_low` where the lamp is effectively off.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use futures::FutureExt;

use homelink_app::ports::{MessageBus, TopicMessage};
use homelink_domain::capability::{
    Applied, CapabilityType, ChangeHandler, ChangeRequest, OnOff, Range, RangeInstance, RangeUnit,
};
use homelink_domain::device::{Device, DeviceKind};
use homelink_domain::error::{ActionError, ActionErrorCode, ValidationError};
use serde::Deserialize;

/// Wiring arguments for one dimmer light.
#[derive(Debug, Clone, Deserialize)]
pub struct DimmerArgs {
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub room: Option<String>,
    /// Topic the dimmer reports its raw value on.
    pub status_topic: String,
    /// Topic raw setpoints are published to.
    pub control_topic: String,
    /// Raw value that turns the lamp fully off.
    pub range_off: i64,
    /// Raw value where visible output starts.
    pub range_low: i64,
    /// Raw value of full brightness.
    pub range_high: i64,
}

fn lock_f64(value: &Arc<Mutex<f64>>) -> std::sync::MutexGuard<'_, f64> {
    value.lock().unwrap_or_else(PoisonError::into_inner)
}

fn percent_of(raw: i64, args: &DimmerArgs) -> f64 {
    let span = (args.range_high - args.range_low) as f64;
    ((raw - args.range_low) as f64 / span * 100.0).max(0.0)
}

fn raw_of(percent: f64, args: &DimmerArgs) -> i64 {
    let span = (args.range_high - args.range_low) as f64;
    let raw = (percent / 100.0 * span) as i64 + args.range_low;
    if raw <= args.range_low {
        // Inside the dead zone the on/off button would flip between two
        // visually-off values; snap to the real off value instead.
        args.range_off
    } else {
        raw
    }
}

/// Build the device and wire its topics to the given bus.
///
/// # Errors
///
/// Returns [`ValidationError`] when the brightness range configuration is
/// invalid.
pub fn build<B>(bus: B, args: DimmerArgs) -> Result<Device, ValidationError>
where
    B: MessageBus + Clone + 'static,
{
    let onoff = OnOff::new().retrievable(true).reportable(true);
    let mut level = Range::builder(RangeInstance::Brightness)
        .unit(RangeUnit::Percent)
        .min_value(0.0)
        .max_value(100.0)
        .precision(if args.range_high - args.range_low < 500 { 1.0 } else { 0.1 })
        .retrievable(true)
        .reportable(true)
        .build()?;

    // Last visible brightness, restored when the lamp is switched back on.
    let last_val = Arc::new(Mutex::new(100.0_f64));

    let level_handler = {
        let bus = bus.clone();
        let level = level.clone();
        let args = args.clone();
        ChangeHandler::new(move |req: ChangeRequest<f64>| {
            let bus = bus.clone();
            let level = level.clone();
            let args = args.clone();
            async move {
                let mut value = req.value;
                if req.options.relative {
                    let current = level.observed().map_err(|err| {
                        ActionError::with_message(
                            CapabilityType::Range,
                            req.instance.clone(),
                            ActionErrorCode::DeviceUnreachable,
                            err.message,
                        )
                    })?;
                    let Some(current) = current else {
                        return Err(ActionError::new(
                            CapabilityType::Range,
                            req.instance,
                            ActionErrorCode::DeviceBusy,
                        ));
                    };
                    value += current;
                }

                let raw = raw_of(value, &args);
                tracing::info!(device = %args.device_id, value, raw, "setting brightness");
                bus.publish(&args.control_topic, &raw.to_string())
                    .await
                    .map_err(|err| {
                        ActionError::with_message(
                            CapabilityType::Range,
                            req.instance.clone(),
                            ActionErrorCode::DeviceUnreachable,
                            err.to_string(),
                        )
                    })?;
                Ok(Applied::new(CapabilityType::Range, req.instance))
            }
            .boxed()
        })
    };
    level.set_change_handler(level_handler);

    let mut switch = onoff.clone();
    let onoff_handler = {
        let bus = bus.clone();
        let last_val = Arc::clone(&last_val);
        let args = args.clone();
        ChangeHandler::new(move |req: ChangeRequest<bool>| {
            let bus = bus.clone();
            let args = args.clone();
            let restore = if req.value { *lock_f64(&last_val) } else { 0.0 };
            async move {
                let raw = if req.value { raw_of(restore, &args) } else { args.range_off };
                tracing::info!(device = %args.device_id, on = req.value, raw, "switching lamp");
                bus.publish(&args.control_topic, &raw.to_string())
                    .await
                    .map_err(|err| {
                        ActionError::with_message(
                            CapabilityType::OnOff,
                            req.instance.clone(),
                            ActionErrorCode::DeviceUnreachable,
                            err.to_string(),
                        )
                    })?;
                Ok(Applied::new(CapabilityType::OnOff, req.instance))
            }
            .boxed()
        })
    };
    switch.set_change_handler(onoff_handler);

    {
        let onoff = switch.clone();
        let level = level.clone();
        let last_val = Arc::clone(&last_val);
        let args_cb = args.clone();
        bus.subscribe(
            &args.status_topic,
            Arc::new(move |msg: TopicMessage| {
                let onoff = onoff.clone();
                let level = level.clone();
                let last_val = Arc::clone(&last_val);
                let args = args_cb.clone();
                async move {
                    let raw: i64 = msg
                        .payload
                        .trim()
                        .parse()
                        .with_context(|| format!("bad dimmer status payload {:?}", msg.payload))?;
                    let percent = percent_of(raw, &args);
                    level.set(percent);
                    onoff.set(percent > 0.0);
                    if percent > 0.0 {
                        *lock_f64(&last_val) = percent;
                    }
                    Ok(())
                }
                .boxed()
            }),
        );
    }

    let mut builder = Device::builder(args.device_id.clone(), DeviceKind::Light)
        .name(args.name.clone())
        .manufacturer("wirenboard")
        .model("dimmer")
        .capability(switch)
        .capability(level);
    if let Some(room) = &args.room {
        builder = builder.room(room.clone());
    }
    builder.build()
}
