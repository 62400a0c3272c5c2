//! A [`Fetcher`] that answers from a fixed table.

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::Url;

use almanac_service::error::TransportError;
use almanac_service::import::{FetchedResponse, Fetcher};

#[derive(Debug, Clone)]
enum Stub {
    Respond { status: u16, body: Vec<u8>, final_url: Option<Url> },
    Fail(String),
}

/// Serves canned responses by exact URL. Unknown URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct StubFetcher {
    stubs: HashMap<String, Stub>,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `url` with status 200 and `body`.
    #[must_use]
    pub fn ok(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.status(url, 200, body)
    }

    #[must_use]
    pub fn status(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.stubs.insert(
            url.to_string(),
            Stub::Respond {
                status,
                body: body.into(),
                final_url: None,
            },
        );
        self
    }

    /// Answers `url` with 200 and `body` after a redirect to `final_url`.
    ///
    /// ## Panics
    /// Panics if `final_url` is not a URL.
    #[must_use]
    pub fn redirect(mut self, url: &str, final_url: &str, body: impl Into<Vec<u8>>) -> Self {
        #[expect(clippy::expect_used, reason = "Test fixtures use literal URLs")]
        let final_url = Url::parse(final_url).expect("redirect target must be a URL");
        self.stubs.insert(
            url.to_string(),
            Stub::Respond {
                status: 200,
                body: body.into(),
                final_url: Some(final_url),
            },
        );
        self
    }

    /// Fails requests for `url` at the transport level.
    #[must_use]
    pub fn fail(mut self, url: &str, message: &str) -> Self {
        self.stubs.insert(url.to_string(), Stub::Fail(message.to_string()));
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        match self.requested.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Fetcher for StubFetcher {
    async fn get(&self, url: &Url) -> Result<FetchedResponse, TransportError> {
        match self.requested.lock() {
            Ok(mut guard) => guard.push(url.to_string()),
            Err(poisoned) => poisoned.into_inner().push(url.to_string()),
        }

        match self.stubs.get(url.as_str()) {
            Some(Stub::Respond {
                status,
                body,
                final_url,
            }) => Ok(FetchedResponse {
                url: final_url.clone().unwrap_or_else(|| url.clone()),
                status: *status,
                body: body.clone(),
            }),
            Some(Stub::Fail(message)) => Err(TransportError(message.clone())),
            None => Err(TransportError(format!("error sending request for url ({url})"))),
        }
    }
}
