//! HTTP client construction and single-shot JSON GET.
//!
//! One attempt only: timeouts and retries live in [`crate::retry`], so the
//! client itself carries just a connect timeout.

use std::time::Duration;

use serde_json::Value;

use crate::error::FetchError;

/// Idle keep-alive connections per host.
///
/// Staggered starts put many requests to the same registry host in flight,
/// so keep a generous pool instead of reconnecting for each identifier.
const POOL_MAX_IDLE_PER_HOST: usize = 64;

/// Build the client shared by every request of a run.
pub fn http_client(connect_timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .user_agent(concat!("pkgsweep/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// GET `url` and parse the body as JSON.
///
/// Non-2xx statuses become [`FetchError::Http`] carrying the status code so
/// the caller can tell a 404 from a transient failure.
pub async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(FetchError::from_reqwest)?;

    let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
    Ok(serde_json::from_slice(&body)?)
}
