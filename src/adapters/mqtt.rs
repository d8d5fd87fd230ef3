// src/adapters/mqtt.rs
//
// Telemetry collaborator: subscribes to the controller's channel topics
// and writes each payload into the shared TelemetryStore. Runs as its own
// task so ingestion continues while a scoring cycle is parked in the stop
// dwell.

use crate::pipeline::metrics::ScoringMetrics;
use crate::pipeline::shutdown::ShutdownSignal;
use crate::telemetry::{Channel, TelemetryStore};
use crate::types::TelemetryConfig;
use anyhow::Result;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct TelemetryListener {
    config: TelemetryConfig,
    store: Arc<TelemetryStore>,
    metrics: ScoringMetrics,
}

impl TelemetryListener {
    pub fn new(
        config: TelemetryConfig,
        store: Arc<TelemetryStore>,
        metrics: ScoringMetrics,
    ) -> Self {
        Self {
            config,
            store,
            metrics,
        }
    }

    pub fn topics(&self) -> Vec<String> {
        Channel::ALL
            .iter()
            .map(|channel| channel.topic(&self.config.topic_prefix))
            .collect()
    }

    /// Route one inbound message. Returns the stored value, or `None` when
    /// the topic is foreign or the payload was rejected.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> Option<i64> {
        let Some(channel) = Channel::from_topic(topic, &self.config.topic_prefix) else {
            debug!("Ignoring message on {}", topic);
            return None;
        };

        match self.store.update(channel, payload) {
            Ok(value) => {
                self.metrics.inc(&self.metrics.telemetry_accepted);
                debug!("Received {}: {}", topic, value);
                Some(value)
            }
            Err(e) => {
                self.metrics.inc(&self.metrics.telemetry_rejected);
                warn!("⚠️  {}", e);
                None
            }
        }
    }

    /// Request every channel topic. A failed request is logged and the
    /// listener keeps running on whatever subscriptions went through.
    pub fn subscribe_all(&self, client: &AsyncClient) -> usize {
        let mut subscribed = 0;
        for topic in self.topics() {
            match client.try_subscribe(topic.clone(), QoS::AtMostOnce) {
                Ok(()) => subscribed += 1,
                Err(e) => warn!("⚠️  Subscribe to {} failed: {}", topic, e),
            }
        }
        if subscribed < Channel::ALL.len() {
            warn!(
                "Subscribed to {}/{} telemetry topics",
                subscribed,
                Channel::ALL.len()
            );
        }
        subscribed
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<()> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        info!(
            "📡 Connecting to MQTT broker {}:{}",
            self.config.broker_host, self.config.broker_port
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    if let Err(e) = client.try_disconnect() {
                        debug!("MQTT disconnect: {}", e);
                    }
                    info!("Telemetry listener stopped");
                    break;
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("✓ Connected to MQTT broker ({:?})", ack.code);
                        // Subscriptions do not survive a clean reconnect
                        self.subscribe_all(&client);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.handle_message(&publish.topic, &publish.payload);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT connection error: {}, retrying", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                },
            }
        }

        Ok(())
    }
}
