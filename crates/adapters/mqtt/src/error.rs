//! MQTT adapter error types.

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttBusError {
    /// The rumqttc client rejected a request (queue full, disconnected, …).
    #[error("mqtt client request failed")]
    Client(#[from] rumqttc::ClientError),
}
