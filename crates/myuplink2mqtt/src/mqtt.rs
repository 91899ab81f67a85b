//! MQTT connection handling and the publish seam.
//!
//! The bridge publishes through a `MessageSink` so the poll loop can be
//! tested without a broker, and so debug mode can swap in a dry run.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Where publishes go. All bridge topics are retained at-least-once.
pub(crate) trait MessageSink {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BridgeError>;
}

/// Broker options shared by the bridge loop and the clear subcommand.
pub fn options(config: &BridgeConfig, client_id: &str) -> MqttOptions {
    let mut opts = MqttOptions::new(client_id, &config.mqtt_broker_host, config.mqtt_broker_port);
    opts.set_keep_alive(Duration::from_secs(30));
    if let (Some(user), Some(pass)) = (&config.mqtt_username, &config.mqtt_password) {
        opts.set_credentials(user, pass);
    }
    opts
}

/// A connected broker client whose event loop runs on a background task.
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect and wait for the broker's CONNACK before returning, so a
    /// bad broker address fails fast instead of during the first cycle.
    pub async fn connect(config: &BridgeConfig, client_id: &str) -> Result<Self, BridgeError> {
        let (client, mut eventloop) = AsyncClient::new(options(config, client_id), 64);

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(BridgeError::MqttConnection {
                        host: config.mqtt_broker_host.clone(),
                        port: config.mqtt_broker_port,
                        source: Box::new(e),
                    });
                }
            }
        }
        info!(
            host = %config.mqtt_broker_host,
            port = config.mqtt_broker_port,
            "connected to MQTT broker"
        );

        // The event loop must keep turning for publishes to go out. It
        // ends when the client disconnects.
        tokio::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    debug!("mqtt event loop stopped: {e}");
                    break;
                }
            }
        });

        Ok(Self { client })
    }

    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        self.client.disconnect().await?;
        Ok(())
    }
}

impl MessageSink for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BridgeError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await?;
        Ok(())
    }
}

/// Debug-mode sink: logs what would be published, touches nothing.
pub struct DryRunSink;

impl MessageSink for DryRunSink {
    async fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BridgeError> {
        info!(
            topic,
            retain,
            payload = %String::from_utf8_lossy(payload),
            "dry run: would publish"
        );
        Ok(())
    }
}
