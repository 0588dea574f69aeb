//! # chord-rest
//!
//! HTTP client for the remote service's REST API.
//!
//! ## Features
//!
//! - **Pacing**: calls are serialised and followed by a fixed pause
//! - **Status mapping**: non-success statuses become [`ClientError`](chord_common::ClientError) variants
//! - **Rate limits**: explicit [`RateLimitPolicy`] for HTTP 429
//! - **Endpoints**: typed helpers for the calls the bot needs
//!
//! ## Example
//!
//! ```ignore
//! use chord_rest::{Method, RestClient};
//!
//! let rest = RestClient::from_config(&config)?;
//! let me = rest.current_user().await?;
//! let raw = rest.call(Method::GET, "/users/@me/guilds", None).await?;
//! ```

mod client;
mod policy;
mod response;
mod routes;
#[cfg(test)]
mod test_support;

pub use client::RestClient;
pub use policy::RateLimitPolicy;
pub use reqwest::Method;
pub use response::interpret_response;
pub use routes::GatewayInfo;
