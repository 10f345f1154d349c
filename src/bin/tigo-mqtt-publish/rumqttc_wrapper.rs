use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use log::{debug, info, warn};
use rumqttc::{
    tokio_rustls::{self, rustls::ClientConfig},
    Client, ConnectReturnCode, Event, MqttOptions, Outgoing, Packet, Transport,
};
use tigo2mqtt::{
    error::PublishError,
    mqtt_config::MqttConfig,
    mqtt_wrapper::{self},
};

static CLIENT_ID: &str = "tigo_energy_client";
const KEEP_ALIVE: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ACK_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct RumqttcWrapper {
    client: Client,
    connected: Arc<AtomicBool>,
    // packet ids of QoS 1 publishes as the event loop sends them
    sent: Receiver<u16>,
    acks: Receiver<u16>,
}

/// Waits until `receiver` yields `pkid`, skipping any other packet id.
/// Returns false once `timeout` has passed.
fn wait_for(receiver: &Receiver<u16>, pkid: u16, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(id) if id == pkid => return true,
            Ok(id) => debug!("ignoring acknowledgement of earlier publish {id}"),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
        }
    }
}

/// Next packet id handed out by the event loop, if any arrives in time.
fn next_sent(receiver: &Receiver<u16>, timeout: Duration) -> Option<u16> {
    receiver.recv_timeout(timeout).ok()
}

fn match_qos(qos: mqtt_wrapper::QoS) -> rumqttc::QoS {
    match qos {
        mqtt_wrapper::QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        mqtt_wrapper::QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        mqtt_wrapper::QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let client_id = config.client_id.as_deref().unwrap_or(CLIENT_ID);
    let mut mqttoptions = MqttOptions::new(client_id, &config.host, config.port());
    mqttoptions.set_keep_alive(KEEP_ALIVE);
    mqttoptions.set_clean_session(false);

    if config.use_tls() {
        // Use rustls-native-certs to load root certificates from the operating system.
        let mut roots = tokio_rustls::rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for e in native.errors {
            warn!("could not load platform certs: {e}");
        }
        for cert in native.certs {
            if let Err(e) = roots.add(cert) {
                warn!("skipping platform cert: {e}");
            }
        }

        let client_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        mqttoptions.set_transport(Transport::tls_with_config(client_config.into()));
    }

    //parse the mqtt authentication options
    if let Some((username, password)) = match (&config.username, &config.password) {
        (None, _) => None,
        (Some(username), _) if username.is_empty() => None,
        (Some(username), None) => Some((username.clone(), "".into())),
        (Some(username), Some(password)) => Some((username.clone(), password.clone())),
    } {
        mqttoptions.set_credentials(username, password);
    }
    mqttoptions
}

impl mqtt_wrapper::MqttWrapper for RumqttcWrapper {
    fn publish<S, V>(
        &mut self,
        topic: S,
        qos: mqtt_wrapper::QoS,
        retain: bool,
        payload: V,
    ) -> anyhow::Result<()>
    where
        S: Clone + Into<String>,
        V: Clone + Into<Vec<u8>>,
    {
        // try publishing up to three times
        if self
            .client
            .try_publish(topic.clone(), match_qos(qos), retain, payload.clone())
            .is_ok()
        {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
        if self
            .client
            .try_publish(topic.clone(), match_qos(qos), retain, payload.clone())
            .is_ok()
        {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(100));
        Ok(self
            .client
            .try_publish(topic, match_qos(qos), retain, payload)?)
    }

    fn publish_and_wait<S, V>(
        &mut self,
        topic: S,
        retain: bool,
        payload: V,
    ) -> Result<(), PublishError>
    where
        S: Clone + Into<String>,
        V: Clone + Into<Vec<u8>>,
    {
        // leftovers of earlier, timed out publishes
        while self.sent.try_recv().is_ok() {}
        while self.acks.try_recv().is_ok() {}

        self.client
            .publish(topic.clone(), rumqttc::QoS::AtLeastOnce, retain, payload)
            .map_err(anyhow::Error::from)?;
        let started = Instant::now();
        let Some(pkid) = next_sent(&self.sent, ACK_TIMEOUT) else {
            return Err(PublishError::NotAcknowledged(topic.into()));
        };
        let remaining = ACK_TIMEOUT.saturating_sub(started.elapsed());
        if wait_for(&self.acks, pkid, remaining) {
            debug!("publish {pkid} acknowledged");
            Ok(())
        } else {
            Err(PublishError::NotAcknowledged(topic.into()))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn new(config: &MqttConfig) -> anyhow::Result<Self> {
        let (client, mut connection) = Client::new(mqtt_options(config), 512);
        let connected = Arc::new(AtomicBool::new(false));
        let (sent_sender, sent) = mpsc::channel();
        let (ack_sender, acks) = mpsc::channel();
        let (startup_sender, startup) = mpsc::sync_channel(1);

        let flag = connected.clone();
        thread::spawn(move || {
            // keep polling the event loop to make sure outgoing messages get sent
            // and to follow the connection state. The loop reconnects by itself
            // on the next iteration after an error.
            let mut startup_sender: Option<SyncSender<Result<(), String>>> = Some(startup_sender);
            for notification in connection.iter() {
                match notification {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        let success = ack.code == ConnectReturnCode::Success;
                        if !flag.swap(success, Ordering::SeqCst) && success {
                            info!("MQTT connection established");
                        }
                        if let Some(sender) = startup_sender.take() {
                            let _ = sender.send(if success {
                                Ok(())
                            } else {
                                Err(format!("{:?}", ack.code))
                            });
                        }
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        let _ = ack_sender.send(ack.pkid);
                    }
                    // QoS 0 publishes carry packet id 0 and are never acknowledged
                    Ok(Event::Outgoing(Outgoing::Publish(pkid))) if pkid != 0 => {
                        let _ = sent_sender.send(pkid);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if flag.swap(false, Ordering::SeqCst) {
                            warn!("MQTT connection lost: {e}");
                        } else {
                            debug!("MQTT connection error: {e}");
                        }
                        if let Some(sender) = startup_sender.take() {
                            let _ = sender.send(Err(e.to_string()));
                        }
                        thread::sleep(RECONNECT_DELAY);
                    }
                }
            }
        });

        match startup.recv_timeout(CONNECT_TIMEOUT) {
            Ok(Ok(())) => Ok(Self {
                client,
                connected,
                sent,
                acks,
            }),
            Ok(Err(e)) => bail!("Failed to connect to MQTT broker {}: {e}", config.host),
            Err(_) => Err(anyhow!(
                "No answer from MQTT broker {} within {CONNECT_TIMEOUT:?}",
                config.host
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn late_ack_of_an_earlier_publish_is_not_taken() {
        let (sender, acks) = mpsc::channel();
        sender.send(7).expect("open channel");
        assert!(!wait_for(&acks, 8, SHORT));

        sender.send(7).expect("open channel");
        sender.send(8).expect("open channel");
        assert!(wait_for(&acks, 8, SHORT));
    }

    #[test]
    fn missing_ack_times_out() {
        let (sender, acks) = mpsc::channel::<u16>();
        assert!(!wait_for(&acks, 1, SHORT));
        drop(sender);
        assert!(!wait_for(&acks, 1, SHORT));
    }

    #[test]
    fn sent_packet_ids_in_order() {
        let (sender, sent) = mpsc::channel();
        sender.send(3).expect("open channel");
        assert_eq!(next_sent(&sent, SHORT), Some(3));
        assert_eq!(next_sent(&sent, SHORT), None);
    }
}
