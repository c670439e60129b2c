//! Shared HTTP plumbing for the library and catalog clients.

use crate::config::ServerConfig;
use crate::error::{CoreError, Result};
use url::Url;

pub const USER_AGENT: &str = "Cadenza/0.1 (https://github.com/cadenza-player/cadenza)";

/// Build a client with the configured timeouts.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn build_client(config: &ServerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Parsed server base URL with a trailing slash, so relative endpoint paths
/// keep any path prefix.
///
/// # Errors
///
/// Returns `ConfigInvalid` if the configured URL does not parse.
pub fn base_url(config: &ServerConfig) -> Result<Url> {
    let mut url = config.base_url()?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Join an endpoint path (without leading slash) onto the base.
///
/// # Errors
///
/// Returns `Network` if the path cannot be joined.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|e| CoreError::Network {
        reason: format!("invalid endpoint {path}: {e}"),
    })
}

/// Resolve a media or cover URL reported by the server. Absolute URLs pass
/// through; `/static/...` style paths resolve against the server host.
#[must_use]
pub fn resolve_url(base: &Url, raw: &str) -> String {
    base.join(raw)
        .map_or_else(|_| raw.to_string(), |url| url.to_string())
}
