//! The poll loop: fetch, classify, publish.
//!
//! Each cycle lists systems, then walks every device: details and data
//! points are fetched, classified, and published as retained state
//! topics. Discovery configs go out once per entity per process, on
//! first sight, so devices appearing mid-run are announced too.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use myuplink_api::{ApiClient, DeviceRef, Error as ApiError, System};
use myuplink_core::{build_discovery_payload, classify, topics, DeviceInfo};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::mqtt::MessageSink;

/// State carried across poll cycles.
#[derive(Debug, Default)]
pub struct CycleContext {
    /// Entities whose discovery config has already been published.
    discovery_sent: HashSet<String>,
    cycle: u64,
}

/// What one cycle accomplished.
#[derive(Debug, Clone, Copy)]
pub struct CycleOutcome {
    pub devices_ok: usize,
    pub devices_failed: usize,
}

/// Run poll cycles until interrupted, or once if `once` is set.
///
/// With `once`, exit is successful iff at least one device was processed.
pub async fn run<S: MessageSink>(
    client: &ApiClient,
    sink: &S,
    config: &BridgeConfig,
    once: bool,
) -> Result<(), BridgeError> {
    let mut ctx = CycleContext::default();

    // Armed once, before the first cycle: a signal arriving mid-cycle is
    // latched here and acted on after in-flight publishes complete.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    loop {
        match run_cycle(client, sink, config, &mut ctx).await {
            Ok(outcome) => {
                info!(
                    cycle = ctx.cycle,
                    ok = outcome.devices_ok,
                    failed = outcome.devices_failed,
                    "poll cycle finished"
                );
                if once {
                    if outcome.devices_ok == 0 {
                        return Err(BridgeError::CycleFailed {
                            failed: outcome.devices_failed,
                        });
                    }
                    return Ok(());
                }
            }
            // A failed cycle is retried on the next tick; only --once
            // treats it as fatal.
            Err(e) => {
                if once {
                    return Err(e);
                }
                warn!(cycle = ctx.cycle, "poll cycle failed: {e}");
            }
        }

        if *shutdown_rx.borrow() {
            info!("interrupt received, shutting down");
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(config.poll_interval)) => {}
            _ = shutdown_rx.changed() => {
                info!("interrupt received, shutting down");
                return Ok(());
            }
        }
    }
}

/// One poll cycle. A failure to list systems ends the cycle with nothing
/// published; per-device failures are isolated and logged.
pub async fn run_cycle<S: MessageSink>(
    client: &ApiClient,
    sink: &S,
    config: &BridgeConfig,
    ctx: &mut CycleContext,
) -> Result<CycleOutcome, BridgeError> {
    ctx.cycle += 1;
    let systems = client.list_systems().await?;
    debug!(cycle = ctx.cycle, systems = systems.len(), "starting poll cycle");

    let mut outcome = CycleOutcome {
        devices_ok: 0,
        devices_failed: 0,
    };
    for system in &systems {
        for device_ref in &system.devices {
            match process_device(client, sink, config, ctx, system, device_ref).await {
                Ok(()) => outcome.devices_ok += 1,
                // A failed token refresh would re-fail identically for
                // every remaining device; end the cycle instead.
                Err(e @ ApiError::Auth { .. }) => return Err(e.into()),
                Err(e) => {
                    outcome.devices_failed += 1;
                    warn!(
                        system = %system.system_id,
                        device = %device_ref.id,
                        "device skipped this cycle: {e}"
                    );
                }
            }
        }
    }
    Ok(outcome)
}

async fn process_device<S: MessageSink>(
    client: &ApiClient,
    sink: &S,
    config: &BridgeConfig,
    ctx: &mut CycleContext,
    system: &System,
    device_ref: &DeviceRef,
) -> Result<(), ApiError> {
    let device = client.get_device_details(&device_ref.id).await?;
    let points = client.get_device_points(&device_ref.id, None).await?;
    let info = DeviceInfo::from(&device);
    debug!(
        device = %device.id,
        product = %device.product.name,
        points = points.len(),
        "processing device"
    );

    let base = &config.mqtt_base_topic;
    let availability = topics::availability_topic(base, &system.system_id, &device.id);
    publish_logged(sink, &availability, b"online", true).await;

    for parameter in &points {
        let sensor = classify(&system.system_id, &device.id, parameter);
        let state_topic =
            topics::state_topic(base, &system.system_id, &device.id, &sensor.parameter_id);

        if !ctx.discovery_sent.contains(&sensor.unique_id) {
            let payload = build_discovery_payload(
                &info,
                &sensor,
                state_topic.clone(),
                availability.clone(),
            );
            let topic = topics::discovery_topic(&config.ha_discovery_prefix, &sensor.unique_id);
            match serde_json::to_vec(&payload) {
                Ok(json) => {
                    publish_logged(sink, &topic, &json, true).await;
                    ctx.discovery_sent.insert(sensor.unique_id.clone());
                }
                Err(e) => warn!(unique_id = %sensor.unique_id, "discovery payload: {e}"),
            }
        }

        publish_logged(sink, &state_topic, sensor.state_value.as_bytes(), true).await;
    }

    Ok(())
}

/// Publish, logging failures instead of propagating them: one lost topic
/// must not abort the rest of the device.
async fn publish_logged<S: MessageSink>(sink: &S, topic: &str, payload: &[u8], retain: bool) {
    if let Err(e) = sink.publish(topic, payload, retain).await {
        warn!(topic, "publish failed: {e}");
    }
}
