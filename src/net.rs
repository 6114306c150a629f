//! HTTP collaborator for the FilterHub service.
//!
//! [`HttpClient`] is the seam the feed and publish code talk through: one
//! GET and one POST, each single-shot, no retries. [`ReqwestClient`] is the
//! production implementation on top of `reqwest`'s blocking client; tests
//! swap in a recording mock.
//!
//! Any non-2xx status counts as a transport failure. Response bodies of
//! successful requests are handed back raw.

use crate::imaging::ImagingError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Feed is not a JSON array: {0}")]
    MalformedFeed(String),
    #[error("Image error: {0}")]
    Imaging(#[from] ImagingError),
}

impl NetworkError {
    /// True for failures that happened on the wire rather than in local
    /// encoding or parsing.
    pub fn is_transport(&self) -> bool {
        matches!(self, NetworkError::Transport(_) | NetworkError::Status { .. })
    }
}

/// A header name/value pair.
pub type Header<'a> = (&'a str, &'a str);

/// Blocking HTTP operations used by the feed and publish flows.
pub trait HttpClient: Sync {
    /// GET `url` and return the body.
    fn get(&self, url: &str, headers: &[Header<'_>]) -> Result<Vec<u8>, NetworkError>;

    /// POST `body` to `url` and return the response body.
    fn post(&self, url: &str, headers: &[Header<'_>], body: Vec<u8>)
    -> Result<Vec<u8>, NetworkError>;
}

/// [`HttpClient`] backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Build a client with a per-request timeout (`None` = wait forever).
    pub fn new(timeout: Option<Duration>) -> Result<Self, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn finish(
        url: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Vec<u8>, NetworkError> {
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, headers: &[Header<'_>]) -> Result<Vec<u8>, NetworkError> {
        let request = headers
            .iter()
            .fold(self.client.get(url), |req, (name, value)| {
                req.header(*name, *value)
            });
        Self::finish(url, request)
    }

    fn post(
        &self,
        url: &str,
        headers: &[Header<'_>],
        body: Vec<u8>,
    ) -> Result<Vec<u8>, NetworkError> {
        let request = headers
            .iter()
            .fold(self.client.post(url), |req, (name, value)| {
                req.header(*name, *value)
            })
            .body(body);
        Self::finish(url, request)
    }
}
