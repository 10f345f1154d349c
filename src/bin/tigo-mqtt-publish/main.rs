mod config;
mod logging;
mod reqwest_wrapper;
mod rumqttc_wrapper;

use anyhow::Context;
use clap::Parser;
use config::{Args, Config};
use reqwest_wrapper::ReqwestWrapper;
use rumqttc_wrapper::RumqttcWrapper;
use std::thread;
use std::time::{Duration, Instant};
use tigo2mqtt::cycle::run_cycle;
use tigo2mqtt::home_assistant::HomeAssistant;
use tigo2mqtt::http::{RetryPolicy, Retrying};
use tigo2mqtt::metric_collector::MetricCollector;
use tigo2mqtt::scheduler::Scheduler;
use tigo2mqtt::tigo::Tigo;

use log::info;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args)?;
    logging::init_logger(config.debug, config.log_file.as_deref())?;

    info!("Running revision: {}", env!("GIT_HASH"));
    match &config.source {
        Some(path) => info!("loaded configuration from {}", path.display()),
        None => info!("no config.toml found, using defaults"),
    }

    let http = ReqwestWrapper::new(Duration::from_secs(config.request_timeout))?;
    let mut tigo = Tigo::new(
        &config.tigo_host,
        config.tigo_auth(),
        Retrying::new(http, RetryPolicy::default()),
    );

    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt.host,
        config.mqtt.port()
    );
    let mut home_assistant =
        HomeAssistant::<RumqttcWrapper>::new(&config.mqtt, config.home_assistant.clone())
            .context("MQTT startup failed")?;
    info!("Publishing to Home Assistant");

    let interval = Duration::from_secs(config.poll_interval);
    info!("using poll interval of {:.2}s", interval.as_secs_f64());
    let mut scheduler = Scheduler::new(interval, Instant::now());

    let mut output_channels: [&mut dyn MetricCollector; 1] = [&mut home_assistant];
    loop {
        run_cycle(&mut tigo, &mut output_channels);
        thread::sleep(scheduler.delay_after(Instant::now()));
    }
}
