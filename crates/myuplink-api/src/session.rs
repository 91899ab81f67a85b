// OAuth session with transparent single-refresh retry.
//
// Every call goes out with the current bearer token. On a 401 the
// session refreshes once via the token endpoint, persists the new token
// through the TokenStore *before* retrying the original call, and
// retries exactly once. A second 401 surfaces as an API error; a failed
// refresh surfaces as an auth error. Never more than one refresh per
// call.
//
// State machine: Unauthenticated -> Authenticated
//   -> (Expired -> Refreshing -> Authenticated | RefreshFailed).

use std::sync::RwLock;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::credentials::Credentials;
use crate::error::Error;
use crate::token::{Token, TokenResponse, TokenStore};
use crate::transport::TransportConfig;

/// Authenticated session against the myUplink API.
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    token: RwLock<Token>,
    store: TokenStore,
}

impl Session {
    /// Create a session from credentials and a previously obtained token.
    ///
    /// The base URL is normalized to end with a slash so relative joins
    /// (`v2/...`) resolve under it.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        token: Token,
        store: TokenStore,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            credentials,
            token: RwLock::new(token),
            store,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Snapshot of the current token (for tests and diagnostics).
    pub fn current_token(&self) -> Token {
        self.token.read().expect("token lock poisoned").clone()
    }

    /// GET a JSON resource, refreshing the token once if the first
    /// attempt is rejected with 401.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        match self.send(url.clone()).await {
            Err(Error::TokenExpired) => {
                self.refresh().await?;
                match self.send(url).await {
                    // The retried call failed 401 again: report it as an
                    // API failure, do not refresh a second time.
                    Err(Error::TokenExpired) => Err(Error::Api {
                        status: 401,
                        message: "access token rejected after refresh".into(),
                    }),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn send<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let bearer = {
            let guard = self.token.read().expect("token lock poisoned");
            guard.access_token.clone()
        };

        debug!("GET {url}");
        let resp = self.http.get(url).bearer_auth(bearer).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::TokenExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body_preview(&body).to_owned()
                },
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = body_preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// Refresh the access token and persist it before the caller retries.
    ///
    /// Token persistence is best effort: a write failure is logged as a
    /// warning (the next process start will redo the refresh) but the
    /// in-memory token is still used for the current call.
    async fn refresh(&self) -> Result<(), Error> {
        let token_url = self
            .base_url
            .join("oauth/token")
            .map_err(Error::InvalidUrl)?;

        let refresh_token = {
            let guard = self.token.read().expect("token lock poisoned");
            guard.refresh_token.clone()
        };

        info!("access token expired, refreshing");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret(),
            ),
        ];

        let resp = self
            .http
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth {
                message: format!("token refresh request failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Auth {
                message: format!(
                    "token refresh rejected (HTTP {status}): {}",
                    body_preview(&body)
                ),
            });
        }

        let wire: TokenResponse = resp.json().await.map_err(|e| Error::Auth {
            message: format!("token refresh response unreadable: {e}"),
        })?;
        let new_token = wire.into_token(Some(&refresh_token));

        if let Err(e) = self.store.save(&new_token) {
            warn!("could not persist refreshed token, continuing with in-memory token: {e}");
        } else {
            info!("token refreshed and saved");
        }

        *self.token.write().expect("token lock poisoned") = new_token;
        Ok(())
    }
}

/// How much of an error body ends up in messages.
const BODY_PREVIEW_BYTES: usize = 200;

/// Leading slice of an error body for diagnostics, cut on a char
/// boundary so multi-byte bodies never panic the slice.
fn body_preview(body: &str) -> &str {
    if body.len() <= BODY_PREVIEW_BYTES {
        return body;
    }
    let mut end = BODY_PREVIEW_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Ensure the base URL ends with `/` so `Url::join` keeps the last path
/// segment.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
