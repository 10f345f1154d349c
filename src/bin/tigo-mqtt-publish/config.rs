use std::path::PathBuf;
use std::{env, fs};

use anyhow::{bail, Context};
use clap::Parser;
use serde_derive::Deserialize;
use tigo2mqtt::http::BasicAuth;
use tigo2mqtt::mqtt_config::{DiscoveryConfig, MqttConfig};

static CONFIG_FILE: &str = "config.toml";
/// One day, in seconds. Longer intervals are not representable on every clock.
const MAX_POLL_INTERVAL: u64 = 86_400;
const MAX_REQUEST_TIMEOUT: u64 = 3_600;

/// Polls a Tigo router and publishes optimizer readings to Home Assistant over MQTT.
#[derive(Debug, Default, Parser)]
#[command(version)]
pub struct Args {
    /// Configuration file, defaults to config.toml in the working directory or next to the binary
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Prefix for device names in Home Assistant
    #[arg(long)]
    pub device_name_prefix: Option<String>,
    /// Model name for the devices in Home Assistant
    #[arg(long)]
    pub device_model: Option<String>,
    #[arg(long)]
    pub mqtt_broker: Option<String>,
    #[arg(long)]
    pub mqtt_port: Option<u16>,
    #[arg(long)]
    pub mqtt_user: Option<String>,
    #[arg(long)]
    pub mqtt_pass: Option<String>,
    /// Address of the Tigo router
    #[arg(long)]
    pub tigo_router: Option<String>,
    /// Seconds between two poll/publish cycles
    #[arg(long)]
    pub poll_interval: Option<u64>,
    /// Base topic of the state messages
    #[arg(long)]
    pub topic_base: Option<String>,
    /// Seconds before a request to the router is abandoned
    #[arg(long)]
    pub request_timeout: Option<u64>,
    /// Append log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub tigo_host: String,
    pub tigo_username: String,
    pub tigo_password: String,
    /// seconds
    pub poll_interval: u64,
    /// seconds
    pub request_timeout: u64,
    pub log_file: Option<PathBuf>,
    pub debug: bool,
    pub home_assistant: DiscoveryConfig,
    pub mqtt: MqttConfig,
    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tigo_host: "10.11.1.211".to_string(),
            tigo_username: "Tigo".to_string(),
            tigo_password: "$olar".to_string(),
            poll_interval: 10,
            request_timeout: 10,
            log_file: None,
            debug: false,
            home_assistant: DiscoveryConfig::default(),
            mqtt: MqttConfig {
                host: "192.168.1.250".to_string(),
                port: Some(1883),
                username: None,
                password: None,
                client_id: Some("tigo_energy_client".to_string()),
                tls: None,
            },
            source: None,
        }
    }
}

impl Config {
    pub fn is_valid(&self) -> bool {
        !self.tigo_host.is_empty()
            && (1..=MAX_POLL_INTERVAL).contains(&self.poll_interval)
            && (1..=MAX_REQUEST_TIMEOUT).contains(&self.request_timeout)
            && self.mqtt.is_valid()
            && self.home_assistant.is_valid()
    }

    pub fn tigo_auth(&self) -> BasicAuth {
        BasicAuth {
            username: self.tigo_username.clone(),
            password: self.tigo_password.clone(),
        }
    }

    /// Defaults, then the config file, then environment variables, then
    /// command line arguments.
    pub fn load(args: &Args) -> anyhow::Result<Config> {
        let mut config = match config_path(args)? {
            Some(path) => {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Could not read {}", path.display()))?;
                let mut config = Config::parse(&contents)
                    .with_context(|| format!("{} unparsable", path.display()))?;
                config.source = Some(path);
                config
            }
            None => Config::default(),
        };

        config.apply_env(|name| env::var(name).ok())?;
        config.apply_args(args);

        if !config.is_valid() {
            bail!(
                "invalid configuration: tigo_host, mqtt host and topic_base must not be empty, \
                 poll_interval must be between one second and one day, \
                 request_timeout between one second and one hour"
            );
        }
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str::<Config>(contents)?)
    }

    fn apply_env<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // $TIGO_HOST
        if let Some(host) = var("TIGO_HOST") {
            self.tigo_host = host;
        }
        // $MQTT_BROKER_HOST
        if let Some(host) = var("MQTT_BROKER_HOST") {
            self.mqtt.host = host;
        }
        // $MQTT_PORT (optional)
        if let Some(port) = var("MQTT_PORT") {
            self.mqtt.port = Some(port.parse().context("MQTT_PORT is not a port number")?);
        }
        // $MQTT_USERNAME (optional)
        if let Some(username) = var("MQTT_USERNAME") {
            self.mqtt.username = Some(username);
        }
        // $MQTT_PASSWORD (optional)
        if let Some(password) = var("MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }
        if let Some(interval) = var("TIGO_POLL_INTERVAL") {
            self.poll_interval = interval
                .parse()
                .context("TIGO_POLL_INTERVAL is not a number of seconds")?;
        }
        if let Some(topic_base) = var("TIGO_TOPIC_BASE") {
            self.home_assistant.topic_base = topic_base;
        }
        if let Some(debug) = var("TIGO_DEBUG") {
            self.debug = matches!(debug.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(prefix) = &args.device_name_prefix {
            self.home_assistant.device_name_prefix = prefix.clone();
        }
        if let Some(model) = &args.device_model {
            self.home_assistant.device_model = model.clone();
        }
        if let Some(topic_base) = &args.topic_base {
            self.home_assistant.topic_base = topic_base.clone();
        }
        if let Some(host) = &args.mqtt_broker {
            self.mqtt.host = host.clone();
        }
        if args.mqtt_port.is_some() {
            self.mqtt.port = args.mqtt_port;
        }
        if args.mqtt_user.is_some() {
            self.mqtt.username = args.mqtt_user.clone();
        }
        if args.mqtt_pass.is_some() {
            self.mqtt.password = args.mqtt_pass.clone();
        }
        if let Some(host) = &args.tigo_router {
            self.tigo_host = host.clone();
        }
        if let Some(interval) = args.poll_interval {
            self.poll_interval = interval;
        }
        if let Some(timeout) = args.request_timeout {
            self.request_timeout = timeout;
        }
        if args.log_file.is_some() {
            self.log_file = args.log_file.clone();
        }
        self.debug |= args.debug;
    }
}

// An explicitly given file has to exist. Otherwise look in the current working
// dir, then next to the executable.
fn config_path(args: &Args) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = &args.config {
        if !path.exists() {
            bail!("{} does not exist", path.display());
        }
        return Ok(Some(path.clone()));
    }

    let mut candidates = vec![env::current_dir()?.join(CONFIG_FILE)];
    if let Some(dir) = env::current_exe()?.parent() {
        candidates.push(dir.join(CONFIG_FILE));
    }
    Ok(candidates.into_iter().find(|path| path.exists()))
}
