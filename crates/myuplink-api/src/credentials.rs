// Client credential resolution.
//
// Precedence: if both MYUPLINK_CLIENT_ID and MYUPLINK_CLIENT_SECRET are
// set in the environment, the environment wins entirely -- no field-level
// merge with the config file. Otherwise the JSON config file at
// ~/.myUplink_API_Config.json is read.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::Error;

/// Environment variable pair that overrides the config file.
pub const ENV_CLIENT_ID: &str = "MYUPLINK_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "MYUPLINK_CLIENT_SECRET";

const CONFIG_FILENAME: &str = ".myUplink_API_Config.json";

/// OAuth client credentials. Sourced once at startup, immutable for the
/// process lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
}

/// Reads credentials from the environment or a JSON config file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The well-known config file location: `~/.myUplink_API_Config.json`.
    pub fn default_path() -> PathBuf {
        home_dir().join(CONFIG_FILENAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load credentials, environment pair first, config file second.
    pub fn load(&self) -> Result<Credentials, Error> {
        let env_id = std::env::var(ENV_CLIENT_ID).ok().filter(|v| !v.is_empty());
        let env_secret = std::env::var(ENV_CLIENT_SECRET)
            .ok()
            .filter(|v| !v.is_empty());
        self.load_with_env(env_id, env_secret)
    }

    /// Resolution logic with the environment values passed in, so tests
    /// can exercise precedence without mutating process environment.
    pub(crate) fn load_with_env(
        &self,
        env_id: Option<String>,
        env_secret: Option<String>,
    ) -> Result<Credentials, Error> {
        if let (Some(client_id), Some(secret)) = (env_id, env_secret) {
            return Ok(Credentials {
                client_id,
                client_secret: SecretString::from(secret),
            });
        }

        if !self.path.exists() {
            return Err(Error::MissingCredentials {
                reason: format!(
                    "set {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET}, or create {} with \
                     {{\"client_id\": \"...\", \"client_secret\": \"...\"}}",
                    self.path.display()
                ),
            });
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|e| Error::MissingCredentials {
            reason: format!("could not read {}: {e}", self.path.display()),
        })?;
        let file: CredentialsFile =
            serde_json::from_str(&raw).map_err(|e| Error::MissingCredentials {
                reason: format!("could not parse {}: {e}", self.path.display()),
            })?;

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok(Credentials {
                client_id: id,
                client_secret: SecretString::from(secret),
            }),
            _ => Err(Error::MissingCredentials {
                reason: format!(
                    "{} is missing client_id or client_secret",
                    self.path.display()
                ),
            }),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

pub(crate) fn home_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf())
}
