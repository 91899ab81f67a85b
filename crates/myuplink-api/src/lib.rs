// myuplink-api: Async Rust client for the myUplink cloud API.
//
// Credential + token stores, an OAuth2 session that refreshes once on
// an expired access token, and a thin set of typed API calls.

pub mod client;
pub mod credentials;
pub mod error;
pub mod models;
pub mod session;
pub mod token;
pub mod transport;

pub use client::{ApiClient, MYUPLINK_API_BASE, ping};
pub use credentials::{CredentialStore, Credentials};
pub use error::Error;
pub use models::{Device, DeviceRef, EnumValue, Parameter, PointValue, Product, System};
pub use session::Session;
pub use token::{Token, TokenStore, check_prerequisites};
pub use transport::TransportConfig;
