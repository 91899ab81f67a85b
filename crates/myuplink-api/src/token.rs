// OAuth token persistence.
//
// The token file at ~/.myUplink_API_Token.json is created by an
// out-of-band authorization step and rewritten here after every refresh.
// Saves are atomic (temp file + rename): a crash mid-write leaves either
// the old token or the new one, never a half-written file that a later
// load would partially accept.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::home_dir;
use crate::error::Error;
use crate::{CredentialStore, Credentials};

const TOKEN_FILENAME: &str = ".myUplink_API_Token.json";

/// Seconds of slack before the recorded expiry at which the token is
/// already treated as expired.
const EXPIRY_MARGIN_SECS: f64 = 30.0;

/// A persisted OAuth token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, seconds since the Unix epoch.
    pub expires_at: f64,
}

impl Token {
    /// Whether the access token is expired (or about to be). Advisory
    /// only -- the API's 401 is the authoritative signal.
    pub fn is_expired(&self) -> bool {
        unix_now() >= self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Token shape as found on the wire or on disk.
///
/// Token endpoints emit a relative `expires_in`; the persisted file
/// carries the absolute `expires_at`. Refresh responses may omit
/// `refresh_token`, in which case the previous one stays valid.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<f64>,
    #[serde(default)]
    pub expires_in: Option<f64>,
}

impl TokenResponse {
    pub(crate) fn into_token(self, previous_refresh: Option<&str>) -> Token {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| unix_now() + self.expires_in.unwrap_or(0.0));
        Token {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_owned))
                .unwrap_or_default(),
            expires_at,
        }
    }
}

fn unix_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0
}

/// Reads and atomically writes the persisted OAuth token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The well-known token file location: `~/.myUplink_API_Token.json`.
    pub fn default_path() -> PathBuf {
        home_dir().join(TOKEN_FILENAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the token. A missing file and an unparsable file both yield
    /// `MissingToken` -- a corrupt file must never produce a partially
    /// populated token.
    pub fn load(&self) -> Result<Token, Error> {
        if !self.path.exists() {
            return Err(Error::MissingToken {
                reason: format!(
                    "token file not found: {}; obtain one via the myUplink authorization \
                     flow and save it there",
                    self.path.display()
                ),
            });
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|e| Error::MissingToken {
            reason: format!("could not read {}: {e}", self.path.display()),
        })?;
        let wire: TokenResponse =
            serde_json::from_str(&raw).map_err(|e| Error::MissingToken {
                reason: format!("could not parse {}: {e}", self.path.display()),
            })?;

        Ok(wire.into_token(None))
    }

    /// Persist the token atomically: write a sibling temp file, then
    /// rename it over the target.
    pub fn save(&self, token: &Token) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| Error::TokenWrite(std::io::Error::other(e)))?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(Error::TokenWrite)?;
        std::fs::rename(&tmp, &self.path).map_err(Error::TokenWrite)?;

        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

/// Verify that both credentials and a token are available before any
/// network I/O. The error names which prerequisite failed, with a
/// remediation hint.
pub fn check_prerequisites(
    credentials: &CredentialStore,
    tokens: &TokenStore,
) -> Result<(Credentials, Token), Error> {
    let creds = credentials.load()?;
    let token = tokens.load()?;
    Ok((creds, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("token.json"))
    }

    #[test]
    fn save_then_load_round_trips_all_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let token = Token {
            access_token: "at-123".into(),
            refresh_token: "rt-456".into(),
            expires_at: 1_700_000_000.5,
        };
        store.save(&token).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, token);
    }

    #[test]
    fn missing_file_is_missing_token_naming_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);

        let err = store.load().expect_err("should fail");
        assert!(matches!(err, Error::MissingToken { .. }));
        assert!(err.to_string().contains("token.json"));
    }

    #[test]
    fn corrupt_file_fails_instead_of_half_loading() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"access_token": "at", "refresh"#).expect("write");

        assert!(matches!(store.load(), Err(Error::MissingToken { .. })));
    }

    #[test]
    fn wire_expires_in_becomes_absolute_expires_at() {
        let wire: TokenResponse =
            serde_json::from_str(r#"{"access_token":"at","refresh_token":"rt","expires_in":3600}"#)
                .expect("parse");
        let token = wire.into_token(None);
        assert!(token.expires_at > unix_now() + 3500.0);
        assert!(!token.is_expired());
    }

    #[test]
    fn refresh_response_without_refresh_token_keeps_previous() {
        let wire: TokenResponse =
            serde_json::from_str(r#"{"access_token":"new-at","expires_in":3600}"#).expect("parse");
        let token = wire.into_token(Some("old-rt"));
        assert_eq!(token.refresh_token, "old-rt");
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        store
            .save(&Token {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_at: 0.0,
            })
            .expect("save");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
