use serde::Serialize;

use crate::mqtt_config::DiscoveryConfig;
use crate::table::DeviceKey;

static DISCOVERY_PREFIX: &str = "homeassistant/sensor";
static MANUFACTURER: &str = "Tigo";

/// `DeviceConfig` is used to define the configuration for a Home Assistant device
/// in the MQTT discovery protocol and is used to group entities together.
///
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    identifiers: Vec<String>,
    name: String,
    manufacturer: String,
    model: String,
    sw_version: String, // Software version of the application that supplies the discovered MQTT item.
}

impl DeviceConfig {
    pub fn new(name: String, model: String, identifiers: Vec<String>) -> Self {
        Self {
            identifiers,
            name,
            manufacturer: MANUFACTURER.to_string(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
            model,
        }
    }
}

/// Unit and device class of a metric, guessed from its column name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorKind {
    Power,
    Current,
    Voltage,
    Temperature,
    SignalStrength,
    Enum,
    Plain,
}

impl SensorKind {
    /// First match wins, so `Voltage_Vin_%` is a voltage.
    pub fn infer(metric: &str) -> Self {
        if metric.contains("Power_W") {
            SensorKind::Power
        } else if metric.contains("Current_A") {
            SensorKind::Current
        } else if metric.contains("Voltage") {
            SensorKind::Voltage
        } else if metric.contains("Temp_C") {
            SensorKind::Temperature
        } else if metric.contains("RSSI") {
            SensorKind::SignalStrength
        } else if ["Bypass", "Event", "Raw"]
            .iter()
            .any(|word| metric.contains(word))
        {
            SensorKind::Enum
        } else {
            SensorKind::Plain
        }
    }

    /// Empty for unit-less metrics.
    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Power => "W",
            SensorKind::Current => "A",
            SensorKind::Voltage => "V",
            SensorKind::Temperature => "°C",
            SensorKind::SignalStrength => "dBm",
            SensorKind::Enum | SensorKind::Plain => "",
        }
    }

    pub fn device_class(self) -> Option<&'static str> {
        match self {
            SensorKind::Power => Some("power"),
            SensorKind::Current => Some("current"),
            SensorKind::Voltage => Some("voltage"),
            SensorKind::Temperature => Some("temperature"),
            SensorKind::SignalStrength => Some("signal_strength"),
            SensorKind::Enum => Some("enum"),
            SensorKind::Plain => None,
        }
    }
}

/// `energy_tigo_<label>_<barcode>`, shared by every sensor of one optimizer.
pub fn sensor_id_base(key: &DeviceKey) -> String {
    format!(
        "energy_tigo_{}",
        key.as_str().replace(DeviceKey::SEPARATOR, "_")
    )
}

/// Maps everything outside `[A-Za-z0-9_-]` to `_` so the id is usable as a
/// topic level.
pub fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `SensorConfig` is used to define the configuration for a Home Assistant sensor entity
/// in the MQTT discovery protocol.
///
/// More information about the MQTT discovery protocol can be found here:
/// https://www.home-assistant.io/docs/mqtt/discovery/
///
/// More information about the Home assistant sensor entities can be found here:
/// https://developers.home-assistant.io/docs/core/entity/sensor/
///
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SensorConfig {
    name: String,        // The name of the sensor.
    unique_id: String,   //  A globally unique identifier for the sensor, not sanitized.
    state_topic: String, // The MQTT topic where sensor readings will be published.
    // exclude optional if they are not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<String>, // The unit of measurement of the sensor.
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<String>, // The type/class of the sensor, e.g. power, voltage, etc.
    device: DeviceConfig, // The device that the sensor belongs to, used to group entities together.
}

impl SensorConfig {
    pub fn new(key: &DeviceKey, metric: &str, discovery: &DiscoveryConfig) -> Self {
        let prefix = &discovery.device_name_prefix;
        let base = sensor_id_base(key);
        let kind = SensorKind::infer(metric);
        let unit = kind.unit();

        let device = DeviceConfig::new(
            format!("{prefix} {key}"),
            discovery.device_model.clone(),
            Vec::from([base.clone()]),
        );
        Self {
            name: format!("{prefix} {key} {metric}"),
            unique_id: format!("{base}_{metric}"),
            state_topic: format!("{}/{key}/{metric}", discovery.topic_base),
            unit_of_measurement: (!unit.is_empty()).then(|| unit.to_string()),
            device_class: kind.device_class().map(str::to_string),
            device,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    pub fn config_topic(&self) -> String {
        format!("{DISCOVERY_PREFIX}/{}/config", sanitize(&self.unique_id))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn panel() -> DeviceKey {
        DeviceKey::new("PanelA", "BC123")
    }

    #[test]
    fn kinds_by_metric_name() {
        assert_eq!(SensorKind::infer("Power_W"), SensorKind::Power);
        assert_eq!(SensorKind::infer("Power_%"), SensorKind::Plain);
        assert_eq!(SensorKind::infer("Current_A"), SensorKind::Current);
        assert_eq!(SensorKind::infer("Voltage_Vout_%"), SensorKind::Voltage);
        assert_eq!(SensorKind::infer("Temp_C"), SensorKind::Temperature);
        assert_eq!(SensorKind::infer("BRSSI"), SensorKind::SignalStrength);
        assert_eq!(SensorKind::infer("Extra_Raw"), SensorKind::Enum);
        assert_eq!(SensorKind::infer("Event"), SensorKind::Enum);
        assert_eq!(SensorKind::infer("Slot"), SensorKind::Plain);
    }

    #[test]
    fn units_and_classes() {
        assert_eq!(SensorKind::Power.unit(), "W");
        assert_eq!(SensorKind::Power.device_class(), Some("power"));
        assert_eq!(SensorKind::SignalStrength.unit(), "dBm");
        assert_eq!(SensorKind::SignalStrength.device_class(), Some("signal_strength"));
        assert_eq!(SensorKind::Temperature.unit(), "°C");
        assert_eq!(SensorKind::Enum.unit(), "");
        assert_eq!(SensorKind::Enum.device_class(), Some("enum"));
        assert_eq!(SensorKind::infer("Slot").unit(), "");
        assert_eq!(SensorKind::infer("Slot").device_class(), None);
    }

    #[test]
    fn sanitizing_ids() {
        assert_eq!(
            sanitize("energy_tigo_PanelA_BC123_Power_W"),
            "energy_tigo_PanelA_BC123_Power_W"
        );
        assert_eq!(sanitize("a.b c-d"), "a_b_c-d");
        assert_eq!(sanitize("Sync/Evt"), "Sync_Evt");
        assert_eq!(sanitize("Voltage_Vin_%"), "Voltage_Vin__");
    }

    #[test]
    fn base_id_collapses_the_key_separator() {
        assert_eq!(sensor_id_base(&panel()), "energy_tigo_PanelA_BC123");
    }

    #[test]
    fn sensor_topics() {
        let sensor = SensorConfig::new(&panel(), "Sync/Evt", &DiscoveryConfig::default());
        assert_eq!(sensor.unique_id(), "energy_tigo_PanelA_BC123_Sync/Evt");
        assert_eq!(
            sensor.config_topic(),
            "homeassistant/sensor/energy_tigo_PanelA_BC123_Sync_Evt/config"
        );
        assert_eq!(
            sensor.state_topic(),
            "homeassistant/sensor/energy/tigo/PanelA___BC123/Sync/Evt"
        );
    }

    #[test]
    fn discovery_payload() {
        let sensor = SensorConfig::new(&panel(), "Power_W", &DiscoveryConfig::default());
        let payload = serde_json::to_value(&sensor).expect("serializable");
        assert_eq!(
            payload,
            json!({
                "name": "Tigo Solar Panel PanelA___BC123 Power_W",
                "unique_id": "energy_tigo_PanelA_BC123_Power_W",
                "state_topic": "homeassistant/sensor/energy/tigo/PanelA___BC123/Power_W",
                "unit_of_measurement": "W",
                "device_class": "power",
                "device": {
                    "identifiers": ["energy_tigo_PanelA_BC123"],
                    "name": "Tigo Solar Panel PanelA___BC123",
                    "manufacturer": "Tigo",
                    "model": "Solar Panel",
                    "sw_version": env!("CARGO_PKG_VERSION"),
                }
            })
        );
    }

    #[test]
    fn plain_sensors_omit_unit_and_class() {
        let sensor = SensorConfig::new(&panel(), "Slot", &DiscoveryConfig::default());
        let payload = serde_json::to_value(&sensor).expect("serializable");
        assert!(payload.get("unit_of_measurement").is_none());
        assert!(payload.get("device_class").is_none());
    }
}
