//! # RestBuilder - Declarative HTTP calls with a managed lifecycle
//!
//! RestBuilder wraps outbound HTTP calls in one consistent lifecycle. A call is
//! declared once with a fluent builder, and executing it takes care of
//! authorization, content encoding, status-code hooks, alert cooldowns,
//! metrics and error enrichment.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restbuilder::{RestClient, StaticToken};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize)]
//! struct CreateOrder {
//!     sku: String,
//!     quantity: u32,
//! }
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Order {
//!     id: u64,
//!     status: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restbuilder::Error> {
//!     let client = RestClient::builder()
//!         .base_url("https://api.example.com")?
//!         .authorization(Arc::new(StaticToken::bearer("secret")))
//!         .app_version("1.0.0")
//!         .build()?;
//!
//!     let order = CreateOrder {
//!         sku: "RB-42".to_string(),
//!         quantity: 2,
//!     };
//!
//!     let record = client
//!         .post::<Order, _>("/orders", order)
//!         .tracking_id("RB1001")
//!         .on_success(|record| println!("Created: {:?}", record.result_object))
//!         .on_failure(|record| eprintln!("Rejected with {:?}", record.status))
//!         .on_exception(|record| eprintln!("Faulted: {:?}", record.fault))
//!         .execute()
//!         .await;
//!
//!     println!("Succeeded: {} in {:?}", record.succeeded, record.elapsed);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Fluent call configuration** - Tracking id, authorization, headers, content type, callbacks and hooks on one builder
//! - **Uniform outcomes** - Success, business failure and fault are routed to separate callbacks; `execute` never returns an error
//! - **Authorization** - Bearer and SAS tokens from a per-call or default provider
//! - **Content strategies** - JSON, form-url-encoded, or a custom generator
//! - **Status hooks** - Built-in alerts for 408, 504, 503 and HTML 403 pages, replaceable per call
//! - **Alert cooldowns** - Repeated alerts for the same condition are suppressed for a window
//! - **Metrics and logging** - Structured `tracing` output with content truncated at 1000 characters
//!
//! ## Error Handling
//!
//! Errors are recorded on the result rather than returned:
//!
//! ```no_run
//! use restbuilder::{Error, RestClient};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = RestClient::builder().base_url("https://api.example.com")?.build()?;
//! let record = client
//!     .get::<serde_json::Value>("/endpoint")
//!     .tracking_id("RB1002")
//!     .execute()
//!     .await;
//!
//! match record.fault.as_ref().map(|fault| fault.error()) {
//!     None if record.succeeded => println!("Success: {:?}", record.result_object),
//!     None => eprintln!("HTTP {:?}: {:?}", record.status, record.result_content),
//!     Some(Error::DeserializationFailed { raw_response, serde_error, status }) => {
//!         eprintln!("Failed to deserialize (status {}):", status);
//!         eprintln!("  Raw response: {}", raw_response);
//!         eprintln!("  Error: {}", serde_error);
//!     }
//!     Some(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Panics inside success, failure and exception callbacks are not caught and
//! propagate out of `execute`.
//!
//! ## Status Hooks
//!
//! ```no_run
//! use http::StatusCode;
//! use restbuilder::{RestClient, StatusHook};
//!
//! # async fn example() -> Result<(), restbuilder::Error> {
//! # let client = RestClient::builder().base_url("https://api.example.com")?.build()?;
//! let record = client
//!     .get_text("/health")
//!     .tracking_id("RB1003")
//!     .no_authorization()
//!     // Treat a bad gateway like a 503.
//!     .status_hook(StatusCode::BAD_GATEWAY, StatusHook::ServerUnavailable)
//!     // Handle HTML 403 pages ourselves.
//!     .clear_status_hook(StatusCode::FORBIDDEN)
//!     .execute()
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
mod auth;
mod builder;
mod client;
mod connectivity;
mod content;
mod engine;
mod error;
pub mod hooks;
pub mod logging;
mod record;
mod request;
mod tracking;
mod transport;

pub use alerts::{Alert, AlertKind, AlertSink, LogAlertSink};
pub use auth::{AuthScheme, AuthorizationProvider, NoAuthorization, StaticToken};
pub use builder::RestBuilder;
pub use client::{RestClient, RestClientBuilder};
pub use connectivity::{AssumeOnline, Connectivity, ConnectivityCheck};
pub use content::{ContentGenerator, ContentType, RequestBody};
pub use error::{Error, Fault, Result};
pub use hooks::{StatusHook, StatusHookRegistry};
pub use logging::{LoggingSink, TracingSink};
pub use record::{ResultFactory, ResultRecord};
pub use request::{HeaderList, OutboundRequest};
pub use tracking::TrackingCounters;
pub use transport::{ReqwestTransport, Transport, TransportResponse};
