//! MQTT connection configuration with serde defaults.

use serde::Deserialize;

/// Broker connection and bridge-topic settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name.
    pub host: String,
    /// Broker TCP port.
    pub port: u16,
    /// Optional username.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Client id; a random suffix is generated when absent.
    pub client_id: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
    /// Topic filter subscribed on every (re)connect; drivers still match
    /// their exact topics within it.
    pub root_topic: String,
    /// Topic the periodic liveness publish goes to.
    pub liveness_topic: String,
    /// Liveness publish interval in seconds.
    pub liveness_interval_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: None,
            keep_alive_secs: 30,
            root_topic: "/devices/#".to_string(),
            liveness_topic: "smarthome".to_string(),
            liveness_interval_secs: 10,
        }
    }
}

impl MqttConfig {
    /// The client id to connect with, generating a random one when the
    /// configuration leaves it unset.
    #[must_use]
    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("homelink-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.root_topic, "/devices/#");
        assert_eq!(config.liveness_interval_secs, 10);
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let config: MqttConfig = toml::from_str(
            "
            host = 'broker.lan'
            username = 'bridge'
            password = 'secret'
            ",
        )
        .unwrap();
        assert_eq!(config.host, "broker.lan");
        assert_eq!(config.port, 1883);
        assert_eq!(config.username.as_deref(), Some("bridge"));
    }

    #[test]
    fn should_generate_client_id_with_prefix_when_unset() {
        let config = MqttConfig::default();
        assert!(config.client_id().starts_with("homelink-"));
    }

    #[test]
    fn should_keep_configured_client_id() {
        let config = MqttConfig {
            client_id: Some("bridge-1".to_string()),
            ..MqttConfig::default()
        };
        assert_eq!(config.client_id(), "bridge-1");
    }
}
