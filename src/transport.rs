//! The seam between the engine and the network.
//!
//! The engine never owns a connection. It hands an [`OutboundRequest`] to a
//! shared [`Transport`] and gets back a [`TransportResponse`] or an error.
//! [`ReqwestTransport`] is the default implementation.

use crate::{request::OutboundRequest, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A response as received from the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: StatusCode,

    /// The reason phrase, when one is known for the status.
    pub reason: Option<String>,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Creates a response with no headers and the canonical reason phrase.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            reason: status.canonical_reason().map(str::to_string),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The default success criteria: any status in `[200, 400)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbuilder::TransportResponse;
    /// use http::StatusCode;
    ///
    /// assert!(TransportResponse::new(StatusCode::NO_CONTENT, "").is_success_status());
    /// assert!(TransportResponse::new(StatusCode::FOUND, "").is_success_status());
    /// assert!(!TransportResponse::new(StatusCode::NOT_FOUND, "").is_success_status());
    /// ```
    pub fn is_success_status(&self) -> bool {
        (200..400).contains(&self.status.as_u16())
    }
}

/// Sends prepared requests.
///
/// A single transport is shared by every call made through a
/// [`RestClient`](crate::RestClient), so implementations must tolerate
/// concurrent use. Connection management, pooling and timeouts belong here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and waits for the response.
    ///
    /// Non-2xx statuses are responses, not errors.
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client with an optional overall request timeout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the underlying client cannot be built.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(TransportResponse {
            status,
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error)
    }
}
