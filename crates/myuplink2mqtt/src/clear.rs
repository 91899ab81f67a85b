//! The `clear` subcommand: remove retained bridge topics from the broker.
//!
//! Subscribes to the discovery and state trees, collects retained topics
//! for a bounded scan window, then publishes empty retained payloads to
//! each. Administrative action, separate from the steady poll loop.

use std::collections::BTreeSet;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, Packet, QoS};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::ClearArgs;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::mqtt;

const CLIENT_ID: &str = "myuplink2mqtt-clear";

pub async fn run(config: &BridgeConfig, args: &ClearArgs) -> Result<(), BridgeError> {
    let (client, mut eventloop) = AsyncClient::new(mqtt::options(config, CLIENT_ID), 64);

    client
        .subscribe(
            format!("{}/sensor/#", config.ha_discovery_prefix),
            QoS::AtLeastOnce,
        )
        .await?;
    client
        .subscribe(format!("{}/#", config.mqtt_base_topic), QoS::AtLeastOnce)
        .await?;

    info!(window = args.scan_window, "scanning for retained topics");
    let deadline = Instant::now() + Duration::from_secs(args.scan_window);
    let mut retained = BTreeSet::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, eventloop.poll()).await {
            Err(_) => break,
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                // Only retained bridge topics; skip tombstones.
                if publish.retain
                    && !publish.payload.is_empty()
                    && is_bridge_topic(&publish.topic, config)
                {
                    debug!(topic = %publish.topic, "found retained topic");
                    retained.insert(publish.topic);
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(BridgeError::MqttConnection {
                    host: config.mqtt_broker_host.clone(),
                    port: config.mqtt_broker_port,
                    source: Box::new(e),
                });
            }
        }
    }

    info!(topics = retained.len(), "scan finished");
    if args.dry_run {
        for topic in &retained {
            println!("{topic}");
        }
        return Ok(());
    }

    // Keep the event loop turning so the tombstones actually go out.
    let driver = tokio::spawn(async move {
        loop {
            if eventloop.poll().await.is_err() {
                break;
            }
        }
    });

    for topic in &retained {
        client
            .publish(topic.as_str(), QoS::AtLeastOnce, true, Vec::new())
            .await?;
        info!(topic = %topic, "cleared");
    }

    client.disconnect().await?;
    let _ = driver.await;
    Ok(())
}

/// Whether a retained topic belongs to this bridge: anything under the
/// configured state tree, or a discovery config for one of our entities.
/// Other tenants of the broker (and of the discovery prefix) stay put.
fn is_bridge_topic(topic: &str, config: &BridgeConfig) -> bool {
    if topic.starts_with(&format!("{}/", config.mqtt_base_topic)) {
        return true;
    }
    topic
        .strip_prefix(&format!("{}/sensor/", config.ha_discovery_prefix))
        .is_some_and(|entity| entity.starts_with("myuplink_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str, prefix: &str) -> BridgeConfig {
        BridgeConfig {
            mqtt_base_topic: base.into(),
            ha_discovery_prefix: prefix.into(),
            ..BridgeConfig::default()
        }
    }

    #[test]
    fn state_tree_follows_the_configured_base_topic() {
        let cfg = config("heatpump", "homeassistant");
        assert!(is_bridge_topic("heatpump/sys-1_dev-1/40004/value", &cfg));
        assert!(is_bridge_topic("heatpump/sys-1_dev-1/available", &cfg));
        // The default base is no longer ours once reconfigured.
        assert!(!is_bridge_topic("myuplink/sys-1_dev-1/40004/value", &cfg));
    }

    #[test]
    fn discovery_configs_match_only_our_entities() {
        let cfg = config("myuplink", "homeassistant");
        assert!(is_bridge_topic(
            "homeassistant/sensor/myuplink_sys_1_dev_1_40004/config",
            &cfg
        ));
        // Another integration sharing the discovery prefix is left alone.
        assert!(!is_bridge_topic(
            "homeassistant/sensor/zigbee_kitchen_temp/config",
            &cfg
        ));
        assert!(!is_bridge_topic("homeassistant/switch/myuplink_x/config", &cfg));
    }

    #[test]
    fn foreign_topics_are_ignored() {
        let cfg = config("myuplink", "homeassistant");
        assert!(!is_bridge_topic("zigbee2mqtt/bridge/state", &cfg));
        // Prefix matching is per segment, not substring.
        assert!(!is_bridge_topic("myuplink2/other/value", &cfg));
    }
}
