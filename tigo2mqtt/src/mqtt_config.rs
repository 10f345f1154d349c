use serde_derive::Deserialize;

/// Connection settings of the MQTT broker.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub tls: Option<bool>,
}

impl MqttConfig {
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty()
    }

    pub fn use_tls(&self) -> bool {
        self.tls.is_some_and(|tls| tls)
    }

    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or_else(|| if self.use_tls() { 8883 } else { 1883 })
    }
}

/// How sensors are named and grouped in Home Assistant.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub device_name_prefix: String,
    pub device_model: String,
    /// Prefix of the state topics, `<topic_base>/<device>/<metric>`.
    pub topic_base: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            device_name_prefix: "Tigo Solar Panel".to_string(),
            device_model: "Solar Panel".to_string(),
            topic_base: "homeassistant/sensor/energy/tigo".to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn is_valid(&self) -> bool {
        !self.topic_base.is_empty()
    }
}
