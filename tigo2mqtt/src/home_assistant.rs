use crate::error::PublishError;
use crate::home_assistant_config::SensorConfig;
use crate::metric_collector::{MetricCollector, PublishReport};
use crate::mqtt_config::{DiscoveryConfig, MqttConfig};
use crate::mqtt_wrapper::{MqttWrapper, QoS};
use crate::table::PollResult;
use crate::value::MetricValue;

use log::{debug, error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateOutcome {
    Published,
    Absent,
}

/// Publishes every optimizer metric as its own Home Assistant sensor.
pub struct HomeAssistant<MQTT: MqttWrapper> {
    client: MQTT,
    discovery: DiscoveryConfig,
}

impl<MQTT: MqttWrapper> HomeAssistant<MQTT> {
    pub fn new(config: &MqttConfig, discovery: DiscoveryConfig) -> anyhow::Result<Self> {
        let client = MQTT::new(config)?;
        Ok(Self::with_client(client, discovery))
    }

    pub fn with_client(client: MQTT, discovery: DiscoveryConfig) -> Self {
        Self { client, discovery }
    }

    pub fn client(&self) -> &MQTT {
        &self.client
    }

    /// Announces one sensor. Discovery configs are retained and not confirmed.
    pub fn publish_discovery(&mut self, sensor: &SensorConfig) -> bool {
        let topic = sensor.config_topic();
        let payload = match serde_json::to_string(sensor) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize discovery message for {topic}: {e}");
                return false;
            }
        };
        debug!("Publishing discovery message to {topic} with payload {payload}");

        if let Err(e) = self.client.publish(topic, QoS::AtMostOnce, true, payload) {
            error!("Failed to publish discovery message: {e:?}");
            return false;
        }
        true
    }

    /// Publishes one reading and waits for the broker to take it.
    pub fn publish_value(
        &mut self,
        state_topic: &str,
        value: &MetricValue,
    ) -> Result<StateOutcome, PublishError> {
        if value.is_absent() {
            debug!("Skipping {state_topic}, no reading");
            return Ok(StateOutcome::Absent);
        }
        if !self.client.is_connected() {
            return Err(PublishError::Disconnected);
        }

        debug!("Publishing to {state_topic}: {value}");
        self.client
            .publish_and_wait(state_topic, false, value.to_payload())?;
        Ok(StateOutcome::Published)
    }
}

impl<MQTT: MqttWrapper> MetricCollector for HomeAssistant<MQTT> {
    fn publish(&mut self, result: &PollResult) -> PublishReport {
        let mut report = PublishReport::default();

        for (key, snapshot) in result.iter() {
            report.devices += 1;
            for (metric, value) in snapshot.metrics() {
                let sensor = SensorConfig::new(key, metric, &self.discovery);
                if self.publish_discovery(&sensor) {
                    report.discovery += 1;
                }

                match self.publish_value(sensor.state_topic(), value) {
                    Ok(StateOutcome::Published) => report.states += 1,
                    Ok(StateOutcome::Absent) => report.absent += 1,
                    Err(PublishError::Disconnected) => {
                        error!("MQTT client is not connected, skipping the rest of this cycle");
                        report.interrupted = true;
                        return report;
                    }
                    Err(e) => {
                        error!("Failed to publish to {}: {e}", sensor.state_topic());
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }
}
