//! Outbound request types.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// A fully prepared request, ready to hand to a [`Transport`](crate::Transport).
///
/// Built by the engine once headers, content and authorization have been applied.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The absolute request URL.
    pub url: Url,

    /// Default, per-call, content-type and authorization headers.
    pub headers: HeaderMap,

    /// The encoded request body, if a payload was sent.
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Per-call request headers, accumulated by the fluent builder.
///
/// Keys are unique (compared case-insensitively) and the last write wins.
/// Empty keys or values are ignored. Names and values are only validated when
/// the request is built.
#[derive(Debug, Clone, Default)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a header. No-op when either side is empty.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || value.is_empty() {
            return;
        }

        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(entry) => *entry = (key, value),
            None => self.entries.push((key, value)),
        }
    }

    /// Looks up a header value by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Number of distinct headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no headers were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes every header into `headers`, overwriting existing values.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a name or value is not valid HTTP.
    pub fn apply_to(&self, headers: &mut HeaderMap) -> crate::Result<()> {
        for (key, value) in &self.entries {
            let name = HeaderName::try_from(key.as_str()).map_err(|e| {
                crate::Error::ConfigurationError(format!("Invalid header name: {}", e))
            })?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                crate::Error::ConfigurationError(format!("Invalid header value: {}", e))
            })?;
            headers.insert(name, value);
        }
        Ok(())
    }
}
