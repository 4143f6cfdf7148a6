//! Send content strategies.
//!
//! A payload is always serialized to JSON first; that text is what gets
//! recorded as `send_content` and logged. The selected [`ContentType`] then
//! decides what bytes actually go on the wire.

use crate::{Error, Result};
use bytes::Bytes;
use http::HeaderValue;
use serde::Serialize;

/// The body encoding used for a call's send payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// The JSON text, sent as `application/json`.
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`, for payloads that serialize as
    /// flat key/value pairs (maps, structs of scalars, `Vec<(K, V)>`).
    FormUrlEncoded,
    /// A caller-supplied generator produces the body.
    Custom,
}

/// An encoded request body and the `Content-Type` it should be sent with.
#[derive(Debug, Clone)]
pub struct RequestBody {
    /// The bytes to transmit.
    pub bytes: Bytes,
    /// The content type header, if any.
    pub content_type: Option<HeaderValue>,
}

impl RequestBody {
    /// A body with an explicit content type.
    pub fn new(bytes: impl Into<Bytes>, content_type: HeaderValue) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: Some(content_type),
        }
    }

    /// A body sent without a `Content-Type` header.
    pub fn untyped(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }
}

/// Produces a body from the typed payload and its JSON text.
pub type ContentGenerator<'a, S> = Box<dyn FnOnce(&S, &str) -> Result<RequestBody> + Send + 'a>;

/// A content type paired with the generator a custom type needs.
pub(crate) struct ContentStrategy<'a, S> {
    kind: ContentType,
    generator: Option<ContentGenerator<'a, S>>,
}

impl<'a, S> Default for ContentStrategy<'a, S> {
    fn default() -> Self {
        Self {
            kind: ContentType::Json,
            generator: None,
        }
    }
}

impl<'a, S> ContentStrategy<'a, S> {
    pub(crate) fn kind(&self) -> ContentType {
        self.kind
    }

    /// Selects a built-in type. Any generator set earlier is dropped.
    pub(crate) fn set(&mut self, kind: ContentType) {
        self.kind = kind;
        self.generator = None;
    }

    pub(crate) fn set_custom(&mut self, generator: ContentGenerator<'a, S>) {
        self.kind = ContentType::Custom;
        self.generator = Some(generator);
    }

    /// Fails when a custom type has no generator.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.kind == ContentType::Custom && self.generator.is_none() {
            return Err(missing_generator());
        }
        Ok(())
    }

    /// Encodes the payload. `json` is the payload's JSON text.
    pub(crate) fn encode(self, payload: &S, json: &str) -> Result<RequestBody>
    where
        S: Serialize,
    {
        match (self.kind, self.generator) {
            (ContentType::Json, _) => Ok(RequestBody::new(
                json.to_owned(),
                HeaderValue::from_static("application/json; charset=utf-8"),
            )),
            (ContentType::FormUrlEncoded, _) => {
                let encoded = serde_urlencoded::to_string(payload).map_err(|e| {
                    Error::SerializationFailed(format!(
                        "Payload cannot be form-url-encoded: {}",
                        e
                    ))
                })?;
                Ok(RequestBody::new(
                    encoded,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                ))
            }
            (ContentType::Custom, Some(generator)) => generator(payload, json),
            (ContentType::Custom, None) => Err(missing_generator()),
        }
    }
}

fn missing_generator() -> Error {
    Error::ConfigurationError(
        "A content generator must be supplied when using ContentType::Custom".to_string(),
    )
}

/// Serializes a payload to JSON text.
pub(crate) fn to_json<S: Serialize>(payload: &S) -> Result<String> {
    serde_json::to_string(payload).map_err(|e| Error::SerializationFailed(e.to_string()))
}
