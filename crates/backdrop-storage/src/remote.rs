//! On-demand fetches of remote images
//!
//! URL policy (scheme, SSRF, allowlist) is enforced by the API before a
//! `Remote` source is ever built; this module only moves bytes.

use std::time::Duration;

use futures::{stream, TryStreamExt};
use reqwest::Url;

use crate::stream::{ByteStream, SourceError, SourceResult};

#[derive(Clone, Debug)]
pub struct RemoteFetcher {
    client: reqwest::Client,
}

impl RemoteFetcher {
    pub fn new(timeout: Duration) -> SourceResult<Self> {
        // A redirect could lead past the address checks made on the original URL
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SourceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RemoteFetcher { client })
    }

    /// Lazily stream the body of `url`.
    ///
    /// Connection failures and non-2xx statuses, redirects included, become
    /// [`SourceError::UpstreamUnavailable`] on first poll.
    pub fn fetch_stream(&self, url: &Url) -> ByteStream {
        let client = self.client.clone();
        let url = url.clone();

        let open = async move {
            let response = client.get(url.clone()).send().await.map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Failed to connect to remote source");
                SourceError::UpstreamUnavailable(format!("Failed to download from URL: {}", e))
            })?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(url = %url, status = %status, "Remote source returned error status");
                return Err(SourceError::UpstreamUnavailable(format!(
                    "URL returned status code: {}",
                    status
                )));
            }

            tracing::debug!(
                url = %url,
                content_length = ?response.content_length(),
                "Streaming remote source"
            );

            let body = response.bytes_stream().map_err(move |e| {
                tracing::warn!(url = %url, error = %e, "Remote source body interrupted");
                SourceError::UpstreamUnavailable(format!("Failed to read response body: {}", e))
            });

            Ok(body)
        };

        Box::pin(stream::once(open).try_flatten())
    }
}
