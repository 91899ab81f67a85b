// Thin typed calls over the authenticated session.
//
// Base path: /v2/
// No caching, no retries beyond the session's single token refresh.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{Device, Parameter, System, SystemsPage};
use crate::session::Session;
use crate::transport::TransportConfig;

/// Production API endpoint.
pub const MYUPLINK_API_BASE: &str = "https://api.myuplink.com";

/// Language sent with point requests so parameter labels come back in a
/// predictable locale.
const POINTS_LANGUAGE: &str = "en-US";

/// Typed client for the myUplink v2 API.
pub struct ApiClient {
    session: Session,
}

impl ApiClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Join a relative path (e.g. `"v2/systems/me"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/`, so joining `v2/...` works.
        self.session
            .base_url()
            .join(path)
            .expect("path should be valid relative URL")
    }

    /// Systems (installations) assigned to the authorized user.
    pub async fn list_systems(&self) -> Result<Vec<System>, Error> {
        let page: SystemsPage = self.session.get_json(self.url("v2/systems/me")).await?;
        Ok(page.systems)
    }

    /// Detailed information for one device.
    pub async fn get_device_details(&self, device_id: &str) -> Result<Device, Error> {
        self.session
            .get_json(self.url(&format!("v2/devices/{device_id}")))
            .await
    }

    /// Data points for one device.
    ///
    /// `parameter_ids: None` requests all available parameters; a
    /// non-empty list requests exactly those ids (vendor-side filtering).
    pub async fn get_device_points(
        &self,
        device_id: &str,
        parameter_ids: Option<&[String]>,
    ) -> Result<Vec<Parameter>, Error> {
        let mut url = self.url(&format!("v2/devices/{device_id}/points"));
        {
            let mut query = url.query_pairs_mut();
            if let Some(ids) = parameter_ids.filter(|ids| !ids.is_empty()) {
                query.append_pair("parameters", &ids.join(","));
            }
            query.append_pair("language", POINTS_LANGUAGE);
        }
        self.session.get_json(url).await
    }
}

/// Advisory connectivity probe against `GET /v2/ping`, unauthenticated.
///
/// Bounded by the transport timeout; a failure here must not prevent the
/// authenticated flow from being attempted.
pub async fn ping(base_url: &str, transport: &TransportConfig) -> Result<bool, Error> {
    let http = transport.build_client()?;
    let url = Url::parse(base_url)?.join("/v2/ping").map_err(Error::InvalidUrl)?;

    debug!("ping {url}");
    match http.get(url).send().await {
        Ok(resp) => Ok(resp.status().is_success()),
        Err(e) if e.is_timeout() || e.is_connect() => Ok(false),
        Err(e) => Err(Error::Transport(e)),
    }
}
