//! Outbound HTTP used by the import pipeline.

use std::future::Future;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ServiceError, ServiceResult, TransportError};

/// A completed response, read to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text; invalid UTF-8 is replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Describes an unsuccessful status the way error messages show it.
    #[must_use]
    pub fn status_error(&self) -> String {
        format!("HTTP status {} for url {}", self.status, self.url)
    }
}

/// Issues GET requests. One attempt per call; no retries.
pub trait Fetcher: Send + Sync {
    fn get(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<FetchedResponse, TransportError>> + Send;
}

/// [`Fetcher`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// ## Summary
    /// Builds a client whose requests give up after `timeout`.
    ///
    /// ## Errors
    /// Returns `ValidationError` if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("almanac/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::ValidationError(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for ReqwestFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &Url) -> Result<FetchedResponse, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(status, bytes = body.len(), "Fetched");
        Ok(FetchedResponse {
            url: final_url,
            status,
            body,
        })
    }
}
