//! npm registry client

use std::future::Future;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use pkgsweep_core::{FetchError, FetchOutcome, RetryPolicy, fetch_with_retry, get_json};
use serde_json::Value;

/// Characters left as-is in a package name segment; everything else,
/// including the `@` and `/` of scoped names, is percent-encoded.
const NAME_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Source of raw package documents, one request per call.
///
/// Implementations perform a single attempt; retry and timeout policy is
/// applied by [`fetch_package`].
pub trait Registry {
    fn fetch_document(&self, name: &str) -> impl Future<Output = Result<Value, FetchError>>;
}

/// The public npm registry (or any mirror speaking the same protocol)
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistry {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn package_url(&self, name: &str) -> String {
        package_url(&self.base_url, name)
    }
}

impl Registry for HttpRegistry {
    fn fetch_document(&self, name: &str) -> impl Future<Output = Result<Value, FetchError>> {
        let url = self.package_url(name);
        async move { get_json(&self.client, &url).await }
    }
}

/// Document URL for `name`: the whole name is one path segment, so a
/// scoped name's `@` and `/` are percent-encoded.
pub fn package_url(base_url: &str, name: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(name, NAME_SEGMENT)
    )
}

/// Fetch one package document under `policy`.
pub async fn fetch_package<R: Registry>(
    registry: &R,
    name: &str,
    policy: &RetryPolicy,
) -> FetchOutcome<Value> {
    fetch_with_retry(name, policy, |_| registry.fetch_document(name)).await
}
