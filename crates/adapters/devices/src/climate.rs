//! Multi-sensor: temperature and humidity telemetry, optional motion events,
//! and a staleness watchdog.
//!
//! The sensor only pushes on change, so silence is ambiguous: either nothing
//! changed or the hardware is gone. The watchdog resolves this by raising
//! the device's query fault after a configurable quiet period; the next
//! message clears it again.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use futures::FutureExt;
use serde::Deserialize;
use tokio::time::Instant;

use homelink_app::ports::{MessageBus, TopicMessage};
use homelink_domain::device::{Device, DeviceKind};
use homelink_domain::error::{QueryError, QueryErrorCode, ValidationError};
use homelink_domain::property::{Event, EventInstance, EventValue, Float, FloatUnit};

/// Wiring arguments for one multi-sensor.
#[derive(Debug, Clone, Deserialize)]
pub struct ClimateArgs {
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub room: Option<String>,
    /// Topic temperature readings arrive on (°C).
    pub temperature_topic: String,
    /// Topic humidity readings arrive on (percent).
    pub humidity_topic: String,
    /// Optional topic for a motion detector ("1" = motion).
    #[serde(default)]
    pub motion_topic: Option<String>,
    /// Mark the device unreachable after this many silent seconds.
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
}

type LastSeen = Arc<Mutex<Instant>>;

fn touch(last_seen: &LastSeen) {
    *last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
}

fn silent_for(last_seen: &LastSeen) -> Duration {
    last_seen
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .elapsed()
}

/// Build the device, wire its topics, and start the staleness watchdog when
/// configured. Must be called within a tokio runtime.
///
/// # Errors
///
/// Returns [`ValidationError`] when the property configuration is invalid.
pub fn build<B>(bus: B, args: ClimateArgs) -> Result<Device, ValidationError>
where
    B: MessageBus + Clone + 'static,
{
    let temperature = Float::temperature(FloatUnit::Celsius)?.reportable(true);
    let humidity = Float::humidity().reportable(true);
    let motion = args
        .motion_topic
        .is_some()
        .then(|| Event::new(EventInstance::Motion).reportable(true));

    let last_seen: LastSeen = Arc::new(Mutex::new(Instant::now()));

    // Any successful reading proves the transport is alive again, so it
    // clears pending faults on every channel, not just its own.
    let revive: Arc<dyn Fn() + Send + Sync> = {
        let temperature = temperature.clone();
        let humidity = humidity.clone();
        let motion = motion.clone();
        let last_seen = Arc::clone(&last_seen);
        Arc::new(move || {
            touch(&last_seen);
            temperature.clear_fault();
            humidity.clear_fault();
            if let Some(motion) = &motion {
                motion.clear_fault();
            }
        })
    };

    {
        let temperature = temperature.clone();
        let revive = Arc::clone(&revive);
        bus.subscribe(
            &args.temperature_topic,
            Arc::new(move |msg: TopicMessage| {
                let temperature = temperature.clone();
                let revive = Arc::clone(&revive);
                async move {
                    let value: f64 = msg
                        .payload
                        .trim()
                        .parse()
                        .with_context(|| format!("bad temperature payload {:?}", msg.payload))?;
                    temperature.assign(value)?;
                    revive();
                    Ok(())
                }
                .boxed()
            }),
        );
    }
    {
        let humidity = humidity.clone();
        let revive = Arc::clone(&revive);
        bus.subscribe(
            &args.humidity_topic,
            Arc::new(move |msg: TopicMessage| {
                let humidity = humidity.clone();
                let revive = Arc::clone(&revive);
                async move {
                    let value: f64 = msg
                        .payload
                        .trim()
                        .parse()
                        .with_context(|| format!("bad humidity payload {:?}", msg.payload))?;
                    humidity.assign(value)?;
                    revive();
                    Ok(())
                }
                .boxed()
            }),
        );
    }
    if let (Some(topic), Some(motion)) = (&args.motion_topic, &motion) {
        let motion = motion.clone();
        let revive = Arc::clone(&revive);
        bus.subscribe(
            topic,
            Arc::new(move |msg: TopicMessage| {
                let motion = motion.clone();
                let revive = Arc::clone(&revive);
                async move {
                    let event = if msg.payload.trim() == "1" {
                        EventValue::Detected
                    } else {
                        EventValue::NotDetected
                    };
                    motion.assign(event)?;
                    revive();
                    Ok(())
                }
                .boxed()
            }),
        );
    }

    if let Some(stale_after_secs) = args.stale_after_secs {
        let stale_after = Duration::from_secs(stale_after_secs);
        let temperature = temperature.clone();
        let humidity = humidity.clone();
        let motion = motion.clone();
        let last_seen = Arc::clone(&last_seen);
        let device_id = args.device_id.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(stale_after);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if silent_for(&last_seen) < stale_after {
                    continue;
                }
                tracing::warn!(device = %device_id, "sensor went silent, marking unreachable");
                let fault = QueryError::new(QueryErrorCode::DeviceUnreachable);
                temperature.fail(fault.clone());
                humidity.fail(fault.clone());
                if let Some(motion) = &motion {
                    motion.fail(fault.clone());
                }
            }
        });
    }

    let mut builder = Device::builder(args.device_id.clone(), DeviceKind::Sensor)
        .name(args.name.clone())
        .manufacturer("wirenboard")
        .model("msw")
        .property(temperature)
        .property(humidity);
    if let Some(motion) = motion {
        builder = builder.property(motion);
    }
    if let Some(room) = &args.room {
        builder = builder.room(room.clone());
    }
    builder.build()
}
