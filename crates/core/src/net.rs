//! Request/response model and the abstract network fetcher.
//!
//! The engine never talks to a socket directly: every network call goes
//! through a [`NetworkFetcher`] supplied by the host.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::canonical::{cache_key, canonicalize};

/// What the requester intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    #[default]
    Empty,
}

/// An outgoing request as seen by the interception handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    /// A GET request with no particular destination.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Empty }
    }

    /// A GET request for a top-level document.
    pub fn document(url: Url) -> Self {
        Self { method: "GET".into(), url, destination: Destination::Document }
    }

    /// Parse and canonicalize `url`, uppercasing `method`.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        let url = canonicalize(url)?;
        Ok(Self { method: method.trim().to_uppercase(), url, destination: Destination::Empty })
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Key under which this request's response is cached.
    pub fn cache_key(&self) -> String {
        cache_key(&self.url)
    }
}

/// An opaque response blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, status_text: "OK".into(), headers: Vec::new(), body: body.into() }
    }

    pub fn with_status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = status;
        self.status_text = status_text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Only plain `200` responses are ever written to a cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access supplied by the host environment.
///
/// Implementations return non-2xx statuses as `Ok` responses and reserve
/// `Err` for transport failures ([`Error::NetworkFailure`],
/// [`Error::FetchTimeout`], [`Error::FetchTooLarge`]).
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Run `fetcher` with an upper bound; expiry is a network failure.
pub async fn fetch_with_timeout(
    fetcher: &dyn NetworkFetcher, request: &Request, timeout: Duration,
) -> Result<Response, Error> {
    match tokio::time::timeout(timeout, fetcher.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
    }
}
