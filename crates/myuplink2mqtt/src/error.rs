//! Bridge error types with miette diagnostics.
//!
//! Maps API and broker failures into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
#[allow(dead_code)]
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    // ── Startup prerequisites ────────────────────────────────────────
    #[error("myUplink API prerequisites are not met")]
    #[diagnostic(
        code(myuplink::prerequisites),
        help(
            "The bridge needs OAuth client credentials and a token before it \
             can reach the API.\n\
             Set MYUPLINK_CLIENT_ID and MYUPLINK_CLIENT_SECRET (or create \
             ~/.myUplink_API_Config.json), and obtain a token via the \
             myUplink authorization flow."
        )
    )]
    Prerequisites {
        #[source]
        source: myuplink_api::Error,
    },

    // ── MQTT ─────────────────────────────────────────────────────────
    #[error("Could not connect to MQTT broker at {host}:{port}")]
    #[diagnostic(
        code(myuplink::mqtt_connection),
        help(
            "Check that the broker is running and reachable.\n\
             Configure it with MQTT_BROKER_HOST / MQTT_BROKER_PORT or in the \
             config file."
        )
    )]
    MqttConnection {
        host: String,
        port: u16,
        #[source]
        source: Box<rumqttc::ConnectionError>,
    },

    #[error("MQTT publish failed")]
    #[diagnostic(code(myuplink::mqtt_publish))]
    MqttPublish(#[from] rumqttc::ClientError),

    // ── API ──────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(myuplink::api))]
    Api(#[from] myuplink_api::Error),

    // ── Poll loop ────────────────────────────────────────────────────
    #[error("poll cycle processed no devices successfully ({failed} failed)")]
    #[diagnostic(
        code(myuplink::cycle_failed),
        help("See the warnings above for per-device failures.")
    )]
    CycleFailed { failed: usize },

    // ── Local I/O ────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(myuplink::io))]
    Io(#[from] std::io::Error),

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(myuplink::config))]
    Config(Box<figment::Error>),
}

impl From<figment::Error> for BridgeError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl BridgeError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Prerequisites { .. } => exit_code::AUTH,
            Self::Api(e) if e.is_startup_fatal() => exit_code::AUTH,
            Self::MqttConnection { .. } => exit_code::CONNECTION,
            Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}
