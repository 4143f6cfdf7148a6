//! The per-call result and the result-type factory.
//!
//! A [`ResultRecord`] is created when a call starts, filled in by the engine as
//! the call moves through its lifecycle, and handed back to the caller once
//! the call is complete.

use crate::{Error, Fault, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Everything a call produced.
///
/// Callbacks receive the record mutably while the call is running; once
/// [`execute`](crate::RestBuilder::execute) returns it is the caller's
/// snapshot of the call.
///
/// # Type Parameters
///
/// * `R` - The result object type
/// * `S` - The send payload type
///
/// # Examples
///
/// ```no_run
/// use restbuilder::RestClient;
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// struct Bin {
///     #[serde(rename = "binId")]
///     bin_id: String,
/// }
///
/// # async fn example() -> Result<(), restbuilder::Error> {
/// let client = RestClient::builder().build()?;
///
/// let record = client
///     .get::<Bin>("https://postb.in/api/bin/123")
///     .tracking_id("RB1002a")
///     .no_authorization()
///     .execute()
///     .await;
///
/// if record.succeeded {
///     println!("Bin: {:?} in {:?}", record.result_object, record.elapsed);
/// } else if let Some(fault) = &record.fault {
///     eprintln!("Call faulted: {}", fault);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResultRecord<R, S> {
    /// The tracking id the call was configured with.
    pub tracking_id: String,

    /// The response status, once a response arrived.
    pub status: Option<StatusCode>,

    /// The response reason phrase.
    pub reason: Option<String>,

    /// The response headers.
    pub headers: HeaderMap,

    /// The payload the call was configured to send.
    pub send_object: Option<S>,

    /// The JSON text of the send payload, once serialized.
    pub send_content: Option<String>,

    /// The result object. Starts as the default result and is replaced by
    /// the decoded response on success.
    pub result_object: Option<R>,

    /// The response body as text. Never truncated.
    pub result_content: Option<String>,

    /// The error the engine caught, with its call context.
    pub fault: Option<Fault>,

    /// Set when a hook or the offline handler showed an alert.
    pub alert_displayed: bool,

    /// Wall-clock time spent in the transport.
    pub elapsed: Duration,

    /// `true` only when the response met the success criteria and its content
    /// was processed without error.
    pub succeeded: bool,
}

impl<R, S> ResultRecord<R, S> {
    pub(crate) fn new(
        tracking_id: impl Into<String>,
        send_object: Option<S>,
        result_object: Option<R>,
    ) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            status: None,
            reason: None,
            headers: HeaderMap::new(),
            send_object,
            send_content: None,
            result_object,
            result_content: None,
            fault: None,
            alert_displayed: false,
            elapsed: Duration::ZERO,
            succeeded: false,
        }
    }

    /// Returns `true` if the engine caught an error.
    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    /// Returns a response header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// `"<tracking id>-<status code>"`, the context string alerts carry.
    pub(crate) fn alert_context(&self) -> String {
        match self.status {
            Some(status) => format!("{}-{}", self.tracking_id, status.as_u16()),
            None => self.tracking_id.clone(),
        }
    }

    /// Takes the result object, leaving `None`.
    pub fn take_result(&mut self) -> Option<R> {
        self.result_object.take()
    }
}

/// Resolves, per result type, the zero value and the default decoding of a
/// successful response.
///
/// Chosen when a call is configured; see the constructors on
/// [`RestClient`](crate::RestClient).
pub struct ResultFactory<R> {
    zero: Option<fn() -> R>,
    decoder: Decoder<R>,
}

enum Decoder<R> {
    Json(fn(&str) -> serde_json::Result<R>),
    Text,
    Raw(fn(Bytes) -> R),
}

impl<R: DeserializeOwned + Default> ResultFactory<R> {
    /// JSON results whose zero value is `R::default()`.
    pub fn json() -> Self {
        Self {
            zero: Some(R::default),
            decoder: Decoder::Json(decode_json::<R>),
        }
    }
}

impl<R: DeserializeOwned> ResultFactory<R> {
    /// JSON results for types with no zero value. The default result is
    /// absent unless one is configured.
    pub fn json_without_default() -> Self {
        Self {
            zero: None,
            decoder: Decoder::Json(decode_json::<R>),
        }
    }
}

impl ResultFactory<String> {
    /// Text results. The body stays in `result_content`; nothing is decoded.
    pub fn text() -> Self {
        Self {
            zero: Some(String::new),
            decoder: Decoder::Text,
        }
    }
}

impl ResultFactory<Bytes> {
    /// Raw results. The body bytes become the result object.
    pub fn raw() -> Self {
        Self {
            zero: Some(Bytes::new),
            decoder: Decoder::Raw(std::convert::identity),
        }
    }
}

impl<R> ResultFactory<R> {
    /// The zero value for `R`, if it has one.
    pub(crate) fn zero(&self) -> Option<R> {
        match self.zero {
            Some(make) => Some(make()),
            None => {
                tracing::debug!(
                    result_type = std::any::type_name::<R>(),
                    "No zero value for result type; default result is absent"
                );
                None
            }
        }
    }

    /// Decodes a successful response. `Ok(None)` leaves the current result
    /// object in place.
    pub(crate) fn decode(&self, content: &str, body: &Bytes, status: StatusCode) -> Result<Option<R>> {
        match &self.decoder {
            Decoder::Json(decode) => {
                if content.is_empty() || content == "null" {
                    return Ok(None);
                }
                decode(content)
                    .map(Some)
                    .map_err(|e| Error::DeserializationFailed {
                        raw_response: content.to_string(),
                        serde_error: e.to_string(),
                        status,
                    })
            }
            Decoder::Text => Ok(None),
            Decoder::Raw(wrap) => Ok(Some(wrap(body.clone()))),
        }
    }
}

fn decode_json<R: DeserializeOwned>(content: &str) -> serde_json::Result<R> {
    serde_json::from_str(content)
}
