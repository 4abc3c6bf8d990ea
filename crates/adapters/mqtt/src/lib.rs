//! # homelink-adapter-mqtt
//!
//! Bridges the hardware MQTT bus into the engine's [`MessageBus`] port.
//!
//! One rumqttc connection is multiplexed into many exact-topic
//! subscriptions. Inbound publishes fan out to every callback registered for
//! the topic; the message is acknowledged only after all of them finish
//! (success or failure), in a task of its own so a stuck callback stalls
//! acknowledgment of that one message only. Reconnection and backoff belong
//! to rumqttc; the run loop simply re-polls after connection errors.

pub mod config;
pub mod error;

pub use config::MqttConfig;
pub use error::MqttBusError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use homelink_app::ports::{MessageBus, TopicCallback, TopicMessage};

/// Pause before re-polling after a connection error.
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

type SubscriptionTable = Arc<RwLock<HashMap<String, Vec<TopicCallback>>>>;

/// Shared handle drivers use to subscribe and publish.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    subscriptions: SubscriptionTable,
}

/// Owns the event loop; created together with [`MqttBus`] and driven by
/// [`run`](MqttBusDriver::run) for the process lifetime.
pub struct MqttBusDriver {
    client: AsyncClient,
    event_loop: EventLoop,
    subscriptions: SubscriptionTable,
    root_topic: String,
    liveness_topic: String,
    liveness_interval: Duration,
}

/// Create the bus handle and its driver from configuration.
///
/// No IO happens here; the connection is established once the driver's
/// [`run`](MqttBusDriver::run) loop starts polling.
#[must_use]
pub fn connect(config: &MqttConfig) -> (MqttBus, MqttBusDriver) {
    let mut options = MqttOptions::new(config.client_id(), &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    options.set_manual_acks(true);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }

    let (client, event_loop) = AsyncClient::new(options, 64);
    let subscriptions: SubscriptionTable = Arc::new(RwLock::new(HashMap::new()));

    let bus = MqttBus {
        client: client.clone(),
        subscriptions: Arc::clone(&subscriptions),
    };
    let driver = MqttBusDriver {
        client,
        event_loop,
        subscriptions,
        root_topic: config.root_topic.clone(),
        liveness_topic: config.liveness_topic.clone(),
        liveness_interval: Duration::from_secs(config.liveness_interval_secs),
    };
    (bus, driver)
}

impl MessageBus for MqttBus {
    fn subscribe(&self, topic: &str, callback: TopicCallback) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push(callback);
    }

    fn publish(&self, topic: &str, payload: &str) -> impl Future<Output = anyhow::Result<()>> + Send {
        let client = self.client.clone();
        let topic = topic.to_string();
        let payload = payload.to_string();
        async move {
            client
                .publish(topic, QoS::AtLeastOnce, false, payload)
                .await
                .map_err(MqttBusError::Client)?;
            Ok(())
        }
    }
}

impl MqttBusDriver {
    /// Drive the connection forever: subscribe to the root topic filter on
    /// every (re)connect, fan inbound publishes out to their callbacks, and
    /// keep a periodic liveness publish going.
    pub async fn run(mut self) {
        let liveness = {
            let client = self.client.clone();
            let topic = self.liveness_topic.clone();
            let period = self.liveness_interval;
            async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    ticker.tick().await;
                    if let Err(err) = client.publish(&topic, QoS::AtMostOnce, false, "ping").await {
                        tracing::debug!(error = %err, "liveness publish failed");
                    }
                }
            }
        };
        tokio::spawn(liveness);

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!(topic = %self.root_topic, "connected, subscribing to root topic");
                    if let Err(err) = self
                        .client
                        .subscribe(self.root_topic.clone(), QoS::AtLeastOnce)
                        .await
                    {
                        tracing::warn!(error = %err, "root subscription failed");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => self.dispatch(publish),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "connection error, retrying");
                    tokio::time::sleep(RECONNECT_PAUSE).await;
                }
            }
        }
    }

    /// Fan one inbound message out to its topic's callbacks and acknowledge
    /// it once every unit of work has finished.
    fn dispatch(&self, publish: rumqttc::Publish) {
        let topic = publish.topic.clone();
        let payload = String::from_utf8_lossy(&publish.payload).into_owned();
        let callbacks = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        let client = self.client.clone();
        tokio::spawn(async move {
            fan_out(&callbacks, &topic, &payload).await;
            if let Err(err) = client.ack(&publish).await {
                tracing::debug!(error = %err, "ack failed");
            }
        });
    }
}

/// Run every callback for one message concurrently and wait for all of them.
/// Failures are logged and contained — one callback never affects its peers.
pub async fn fan_out(callbacks: &[TopicCallback], topic: &str, payload: &str) {
    let units = callbacks.iter().map(|callback| {
        callback(TopicMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        })
    });
    for result in future::join_all(units).await {
        if let Err(err) = result {
            tracing::warn!(topic, error = %err, "topic callback failed");
        }
    }
}
