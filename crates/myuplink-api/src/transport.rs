// Shared transport configuration for building reqwest::Client instances.
//
// Both the authenticated session and the unauthenticated ping probe go
// through this module so timeout handling stays in one place. Every
// network call gets a finite timeout; a vendor-side hang must never
// freeze the poll loop.

use std::time::Duration;

/// Transport settings for HTTP clients talking to the myUplink API.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("myuplink2mqtt/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}
