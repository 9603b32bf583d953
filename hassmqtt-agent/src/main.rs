//! hassmqtt agent - publishes host metrics to Home Assistant
//!
//! This agent:
//! - Derives a stable client ID for this host and user
//! - Describes the host as one Home Assistant device with one sensor per metric
//! - Samples system metrics on an interval and publishes them over MQTT,
//!   re-announcing discovery config as needed

mod config;
mod metrics;

use anyhow::{Context, Result};
use config::AgentConfig;
use hassmqtt::Device;
use metrics::{AgentMetric, SystemSampler};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main agent state
struct Agent {
    config: AgentConfig,
    device: Arc<Device>,
    metrics: Vec<AgentMetric>,
    sampler: SystemSampler,
    mqtt_client: AsyncClient,
}

impl Agent {
    /// Create new agent instance
    async fn new() -> Result<Self> {
        let config = AgentConfig::load()
            .await
            .context("Failed to load configuration")?;

        let client_id = match &config.mqtt.client_id {
            Some(id) => id.clone(),
            None => hassmqtt::client_id(&config.device.client_prefix),
        };

        let device = Arc::new(build_device(&config, &client_id));
        let metrics = metrics::enabled_metrics(&config.publish.metrics, &device);
        if metrics.is_empty() {
            anyhow::bail!("No known metric enabled in publish.metrics");
        }

        // Configure MQTT client
        let mut mqtt_options = MqttOptions::new(
            &client_id,
            &config.mqtt.broker_host,
            config.mqtt.broker_port,
        );
        mqtt_options.set_keep_alive(Duration::from_secs(config.mqtt.keep_alive_secs.max(5)));
        mqtt_options.set_clean_session(true);

        // room for a config + value per metric
        let (mqtt_client, mut eventloop) = AsyncClient::new(mqtt_options, metrics.len() * 2 + 10);

        // Start MQTT event loop in background
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("Connected to MQTT broker");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT connection error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        info!(
            "Agent initialized - client: {}, device: {}/{}, {} metrics",
            client_id,
            device.namespace,
            device.id,
            metrics.len()
        );

        Ok(Agent {
            config,
            device,
            metrics,
            sampler: SystemSampler::new(),
            mqtt_client,
        })
    }

    /// Start agent main loop, until Ctrl-C
    async fn run(&mut self) -> Result<()> {
        info!(
            "Publishing every {}s to {}:{}",
            self.config.publish.interval_secs,
            self.config.mqtt.broker_host,
            self.config.mqtt.broker_port
        );

        let period = Duration::from_secs(self.config.publish.interval_secs);
        let mut publish_timer = interval(period);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = publish_timer.tick() => {}
                signal = &mut shutdown => {
                    signal.context("Failed to listen for shutdown signal")?;
                    break;
                }
            }

            let sample = self.sampler.sample();
            debug!("Sampled {:?}", sample);

            // a pass never outlives its interval, and Ctrl-C still wins mid-pass
            let pass = metrics::publish_sample_within(&self.metrics, &self.mqtt_client, &sample, period);
            tokio::select! {
                outcome = pass => self.report(outcome),
                signal = &mut shutdown => {
                    signal.context("Failed to listen for shutdown signal")?;
                    break;
                }
            }
        }

        info!("Shutting down");
        // a stalled request queue must not hold shutdown hostage
        if let Err(e) = self.mqtt_client.try_disconnect() {
            warn!("Could not queue MQTT disconnect: {}", e);
        }
        Ok(())
    }

    fn report(&self, outcome: Option<usize>) {
        match outcome {
            Some(0) => {}
            Some(failures) => warn!(
                "{}/{} metrics of {} failed to publish",
                failures,
                self.metrics.len(),
                self.device.id
            ),
            None => warn!(
                "Publish pass for {} did not finish within {}s",
                self.device.id, self.config.publish.interval_secs
            ),
        }
    }
}

/// Device descriptor from config; display name falls back to the device id
fn build_device(config: &AgentConfig, client_id: &str) -> Device {
    let device_config = &config.device;
    let id = device_config.device_id();
    let name = if device_config.name.is_empty() {
        id.clone()
    } else {
        device_config.name.clone()
    };

    Device {
        name,
        manufacturer: device_config.manufacturer.clone(),
        model: device_config.model.clone(),
        hw_version: device_config.hw_version.clone(),
        sw_version: device_config.sw_version.clone(),
        ..Device::new(&device_config.namespace, client_id, id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hassmqtt=info,hassmqtt_agent=info")),
        )
        .init();

    info!("hassmqtt agent starting...");

    let mut agent = Agent::new().await.context("Failed to create agent")?;

    agent.run().await.context("Agent execution failed")?;

    Ok(())
}
