//! Error types for HTTP calls.
//!
//! [`Error`] describes what went wrong. [`Fault`] is what a call records on its
//! [`ResultRecord`](crate::ResultRecord): the error plus the structured call
//! context (tracking id, URI, method, duration, truncated bodies, status) that
//! was attached when the engine caught it.

use http::StatusCode;
use std::fmt;

/// The main error type for HTTP calls.
///
/// Errors never escape [`RestBuilder::execute`](crate::RestBuilder::execute);
/// they are wrapped in a [`Fault`] and stored on the result.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error reported by the `reqwest` transport.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A failure reported by a custom [`Transport`](crate::Transport).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting for a response.
    #[error("Request timed out")]
    Timeout,

    /// Failed to deserialize the response body into the expected type.
    ///
    /// The raw response text is preserved for debugging.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The call was configured in a way that can never be dispatched.
    ///
    /// Raised for a blank tracking id, a custom content type without a
    /// generator, an authorization scheme whose token is empty, and header
    /// names or values that are not valid HTTP.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the send payload.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A caller-supplied result content transform rejected the response.
    #[error("Failed to process result content: {0}")]
    ResultContent(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` for errors that stop a call before it is dispatched.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbuilder::Error;
    ///
    /// let err = Error::ConfigurationError("A tracking id is required".to_string());
    /// assert!(err.is_configuration());
    /// assert!(!Error::Timeout.is_configuration());
    /// ```
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ConfigurationError(_) | Error::InvalidUrl(_) | Error::SerializationFailed(_)
        )
    }

    /// Returns `true` if the transport failed to produce a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Transport(_) | Error::Timeout
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An [`Error`] caught by the engine, enriched with call context.
///
/// Context entries keep the order in which they were attached.
///
/// # Examples
///
/// ```
/// use restbuilder::{Error, Fault};
///
/// let fault = Fault::new(Error::Timeout)
///     .with_context("tracking_id", "RB1001")
///     .with_context("method", "GET");
///
/// assert_eq!(fault.context_value("tracking_id"), Some("RB1001"));
/// assert!(matches!(fault.error(), Error::Timeout));
/// ```
#[derive(Debug)]
pub struct Fault {
    error: Error,
    context: Vec<(String, String)>,
}

impl Fault {
    /// Wraps an error with no context.
    pub fn new(error: Error) -> Self {
        Self {
            error,
            context: Vec::new(),
        }
    }

    /// Attaches a context entry. An existing entry with the same key is replaced.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    pub(crate) fn extend_context(&mut self, entries: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    fn insert(&mut self, key: String, value: String) {
        match self.context.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.context.push((key, value)),
        }
    }

    /// The underlying error.
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Consumes the fault and returns the underlying error.
    pub fn into_error(self) -> Error {
        self.error
    }

    /// All context entries in attachment order.
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Looks up a single context entry.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl From<Error> for Fault {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(tracking_id) = self.context_value("tracking_id") {
            write!(f, " [{}]", tracking_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
