//! Fallback orchestration: local attempt, then at most one remote attempt
//!
//! Every capture operation runs through [`FallbackOrchestrator::dispatch`],
//! which owns the `LocalAttempt -> RemoteAttempt -> Terminal` state machine.
//! The local pipeline is passed in as a unit of work; on failure the original
//! request is re-serialized (unset fields omitted) and POSTed to the remote
//! peer's equivalent endpoint. No tier is ever attempted twice and a
//! mid-operation local failure discards any partial segments.

use crate::request::{RenderEndpoint, RenderRequest};
use crate::RenderError;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Which tier produced the final result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome<T> {
    Local(T),
    Remote(T),
}

impl<T> FallbackOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            FallbackOutcome::Local(v) | FallbackOutcome::Remote(v) => v,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, FallbackOutcome::Remote(_))
    }
}

/// HTTP client for the remote rendering peer.
pub struct RemoteTier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteTier {
    /// `base_url` must be an absolute http(s) URL; a trailing slash is
    /// appended when missing so endpoint paths join cleanly.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RenderError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| RenderError::RemoteFallbackFailed(format!("invalid peer URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RenderError::RemoteFallbackFailed(format!(
                "unsupported peer URL scheme: {}",
                parsed.scheme()
            )));
        }

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RenderError::RemoteFallbackFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn endpoint_url(&self, endpoint: RenderEndpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// POST the request to the peer's equivalent endpoint and parse its JSON
    /// response. A transport error or non-success status is terminal.
    pub async fn render<T: DeserializeOwned>(
        &self,
        endpoint: RenderEndpoint,
        request: &RenderRequest,
    ) -> Result<T, RenderError> {
        let url = self.endpoint_url(endpoint);
        info!("Requesting remote render at {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RenderError::RemoteFallbackFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Remote render failed with status {}: {}", status, body);
            return Err(RenderError::RemoteFallbackFailed(format!(
                "peer returned status {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RenderError::RemoteFallbackFailed(e.to_string()))
    }
}

/// The state machine wrapping every capture operation.
pub struct FallbackOrchestrator {
    remote: Option<RemoteTier>,
    remote_only: bool,
}

impl FallbackOrchestrator {
    pub fn new(remote: Option<RemoteTier>, remote_only: bool) -> Self {
        Self { remote, remote_only }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Run `local` inside the failure boundary, falling back to the remote
    /// tier when it is configured and the failure class allows it.
    ///
    /// `local_available` reflects whether a local browser process exists at
    /// all; when it does not and no peer is configured the operation
    /// terminates immediately without attempting anything.
    pub async fn dispatch<T, F, Fut>(
        &self,
        endpoint: RenderEndpoint,
        request: &RenderRequest,
        local_available: bool,
        local: F,
    ) -> Result<FallbackOutcome<T>, RenderError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RenderError>>,
    {
        if !local_available && self.remote.is_none() {
            warn!("Browser is not initialized and no remote peer is configured.");
            return Err(RenderError::BrowserUnavailable);
        }

        if self.remote_only {
            warn!("Local rendering is disabled, using remote peer only.");
        } else if local_available {
            match local().await {
                Ok(result) => return Ok(FallbackOutcome::Local(result)),
                Err(e) if e.is_caller_error() => return Err(e),
                Err(e) => {
                    let params = serde_json::to_string(request).unwrap_or_default();
                    error!(
                        "Local {} failed with options {}: {}",
                        endpoint.name(),
                        params,
                        e
                    );
                    if !e.triggers_fallback() || self.remote.is_none() {
                        return Err(e);
                    }
                }
            }
        }

        let remote = self
            .remote
            .as_ref()
            .ok_or(RenderError::BrowserUnavailable)?;
        let result = remote.render(endpoint, request).await?;
        Ok(FallbackOutcome::Remote(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_url_validation() {
        assert!(RemoteTier::new("https://render.example.com", Duration::from_secs(30)).is_ok());
        assert!(RemoteTier::new("ftp://render.example.com", Duration::from_secs(30)).is_err());
        assert!(RemoteTier::new("not a url", Duration::from_secs(30)).is_err());
    }

    #[test]
    fn endpoint_urls_join_with_single_slash() {
        let tier = RemoteTier::new("https://render.example.com", Duration::from_secs(30)).unwrap();
        assert_eq!(
            tier.endpoint_url(RenderEndpoint::ElementScreenshot),
            "https://render.example.com/element_screenshot/"
        );

        let tier = RemoteTier::new("https://render.example.com/", Duration::from_secs(30)).unwrap();
        assert_eq!(
            tier.endpoint_url(RenderEndpoint::PageScreenshot),
            "https://render.example.com/page/"
        );
    }
}
