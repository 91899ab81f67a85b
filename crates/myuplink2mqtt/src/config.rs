//! Bridge configuration: defaults, TOML file, environment.
//!
//! Precedence (lowest to highest): built-in defaults, then
//! `~/.config/myuplink2mqtt/config.toml`, then environment variables.
//! A `-p/--poll` CLI flag overrides all of them.

use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Environment variables recognized by the bridge. Each maps onto the
/// lowercase field of the same name.
const ENV_KEYS: &[&str] = &[
    "MQTT_BROKER_HOST",
    "MQTT_BROKER_PORT",
    "MQTT_USERNAME",
    "MQTT_PASSWORD",
    "MQTT_BASE_TOPIC",
    "HA_DISCOVERY_PREFIX",
    "POLL_INTERVAL",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    pub mqtt_broker_host: String,
    pub mqtt_broker_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_base_topic: String,
    pub ha_discovery_prefix: String,
    /// Seconds between poll cycles.
    pub poll_interval: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mqtt_broker_host: "localhost".into(),
            mqtt_broker_port: 1883,
            mqtt_username: None,
            mqtt_password: None,
            mqtt_base_topic: "myuplink".into(),
            ha_discovery_prefix: "homeassistant".into(),
            poll_interval: 120,
        }
    }
}

impl BridgeConfig {
    /// Load from defaults, the config file, and the environment.
    pub fn load() -> Result<Self, BridgeError> {
        Self::from_figment(Self::figment().merge(Env::raw().only(ENV_KEYS)))
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_path()))
    }

    fn from_figment(figment: Figment) -> Result<Self, BridgeError> {
        figment.extract().map_err(BridgeError::from)
    }

    /// Effective configuration as TOML, for `--show-config`. The MQTT
    /// password is masked.
    pub fn render(&self) -> String {
        let masked = Self {
            mqtt_password: self.mqtt_password.as_ref().map(|_| "********".into()),
            ..self.clone()
        };
        toml::to_string_pretty(&masked).unwrap_or_default()
    }
}

/// Config file location via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "myuplink2mqtt", "myuplink2mqtt")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("myuplink2mqtt");
            p.push("config.toml");
            p
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config = BridgeConfig::from_figment(
            Figment::new().merge(Serialized::defaults(BridgeConfig::default())),
        )
        .expect("defaults");

        assert_eq!(config.mqtt_broker_host, "localhost");
        assert_eq!(config.mqtt_broker_port, 1883);
        assert_eq!(config.mqtt_base_topic, "myuplink");
        assert_eq!(config.ha_discovery_prefix, "homeassistant");
        assert_eq!(config.poll_interval, 120);
        assert_eq!(config.mqtt_username, None);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = BridgeConfig::from_figment(
            Figment::new()
                .merge(Serialized::defaults(BridgeConfig::default()))
                .merge(Toml::string(
                    r#"
                    mqtt_broker_host = "broker.lan"
                    poll_interval = 60
                    "#,
                )),
        )
        .expect("toml config");

        assert_eq!(config.mqtt_broker_host, "broker.lan");
        assert_eq!(config.poll_interval, 60);
        // Untouched keys keep their defaults.
        assert_eq!(config.mqtt_broker_port, 1883);
    }

    #[test]
    fn environment_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MQTT_BROKER_HOST", "env-broker");
            jail.set_env("POLL_INTERVAL", "15");

            let config = BridgeConfig::from_figment(
                Figment::new()
                    .merge(Serialized::defaults(BridgeConfig::default()))
                    .merge(Toml::string("mqtt_broker_host = \"file-broker\""))
                    .merge(Env::raw().only(ENV_KEYS)),
            )
            .expect("env config");

            assert_eq!(config.mqtt_broker_host, "env-broker");
            assert_eq!(config.poll_interval, 15);
            Ok(())
        });
    }

    #[test]
    fn render_masks_the_password() {
        let config = BridgeConfig {
            mqtt_password: Some("hunter2".into()),
            ..BridgeConfig::default()
        };
        let rendered = config.render();
        assert!(rendered.contains("********"));
        assert!(!rendered.contains("hunter2"));
    }
}
