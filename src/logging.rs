//! Structured logging and metric sinks.
//!
//! Every call reports to a [`LoggingSink`]: one metric when a response is
//! classified, one fault entry when the engine catches an error. The default
//! [`TracingSink`] turns both into `tracing` events.

use crate::Fault;

/// Longest send or result content that is logged verbatim.
pub const CONTENT_LOG_LIMIT: usize = 1000;

const ELLIPSIS: &str = " ...";
const EXCLUDED: &str = "Excluded";

/// Consumes metrics and faults produced by calls.
///
/// Implementations are shared across concurrent calls.
pub trait LoggingSink: Send + Sync {
    /// Records a metric event with its properties.
    fn metric(&self, event: &str, properties: &[(String, String)]);

    /// Records a fault caught by the engine.
    fn fault(&self, fault: &Fault);
}

/// Forwards metrics and faults to `tracing`.
///
/// Metrics are emitted at `INFO` and faults at `ERROR` under the
/// `restbuilder` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LoggingSink for TracingSink {
    fn metric(&self, event: &str, properties: &[(String, String)]) {
        tracing::info!(
            target: "restbuilder",
            event = %event,
            properties = ?properties,
            "RestBuilder metric"
        );
    }

    fn fault(&self, fault: &Fault) {
        tracing::error!(
            target: "restbuilder",
            error = %fault.error(),
            context = ?fault.context(),
            "RestBuilder call faulted"
        );
    }
}

/// Which side of a call a piece of content belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSide {
    /// The serialized send payload.
    Sent,
    /// The response body.
    Returned,
}

/// Renders content for logs and metrics.
///
/// Excluded content becomes `"Excluded"`, missing or empty content becomes a
/// sentinel, and anything over [`CONTENT_LOG_LIMIT`] characters is cut to the
/// limit with a `" ..."` marker. The stored content is never touched.
///
/// # Examples
///
/// ```
/// use restbuilder::logging::{content_log_text, ContentSide};
///
/// assert_eq!(content_log_text(Some("{}"), ContentSide::Sent, false), "{}");
/// assert_eq!(content_log_text(Some("{}"), ContentSide::Sent, true), "Excluded");
/// assert_eq!(content_log_text(None, ContentSide::Returned, false), "Null content returned.");
///
/// let long = "x".repeat(1500);
/// let logged = content_log_text(Some(&long), ContentSide::Returned, false);
/// assert_eq!(logged.len(), 1004);
/// assert!(logged.ends_with(" ..."));
/// ```
pub fn content_log_text(content: Option<&str>, side: ContentSide, excluded: bool) -> String {
    if excluded {
        return EXCLUDED.to_string();
    }

    match (content, side) {
        (None, ContentSide::Sent) => "Null content sent.".to_string(),
        (None, ContentSide::Returned) => "Null content returned.".to_string(),
        (Some(""), ContentSide::Sent) => "Empty content sent.".to_string(),
        (Some(""), ContentSide::Returned) => "Empty content returned.".to_string(),
        (Some(text), _) => truncate(text, CONTENT_LOG_LIMIT),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
