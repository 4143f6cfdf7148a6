//! The call lifecycle.
//!
//! `execute` walks a configured [`RestBuilder`] through tracking validation,
//! the connectivity precheck, request construction, content encoding,
//! authorization, dispatch, status hooks and success classification, and
//! hands back the [`ResultRecord`].
//!
//! Errors the engine raises or the transport reports are caught, enriched with
//! call context and stored on the record. Panics inside caller callbacks are
//! not caught.

use crate::{
    alerts::{Alert, AlertKind},
    auth,
    connectivity::Connectivity,
    content::to_json,
    hooks::HookEnv,
    logging::{content_log_text, ContentSide, LoggingSink},
    request::OutboundRequest,
    transport::TransportResponse,
    Error, Fault, RestBuilder, Result, ResultRecord,
};
use http::{header::CONTENT_TYPE, Method, StatusCode};
use serde::Serialize;
use std::time::Instant;

const NO_CONNECTION_MESSAGE: &str =
    "No network connection is available. Connect to a network and try again.";
const UNREACHABLE_MESSAGE: &str =
    "The internet cannot be reached. Check your network connection and try again.";

impl<'a, R, S> RestBuilder<'a, R, S>
where
    S: Serialize,
{
    /// Runs the call and returns its result.
    ///
    /// Never fails: configuration, transport and decoding errors end up in
    /// [`ResultRecord::fault`] and are reported to the exception callback.
    /// A response that fails the success criteria is routed to the failure
    /// callback.
    ///
    /// # Panics
    ///
    /// A panic raised inside a success, failure, exception or offline
    /// callback propagates to the caller.
    pub async fn execute(mut self) -> ResultRecord<R, S> {
        let client = self.client;
        let sink = self
            .logging_sink
            .take()
            .unwrap_or_else(|| client.default_logging_sink());

        let default_result = match self.default_result.take() {
            Some(result) => Some(result),
            None => self.factory.zero(),
        };
        let mut record =
            ResultRecord::new(self.tracking_id.clone(), self.send_object.take(), default_result);

        if self.tracking_id.trim().is_empty() {
            let error = Error::ConfigurationError("A tracking id must be supplied".to_string());
            self.record_fault(&mut record, error, sink.as_ref());
            return record;
        }

        let invocation = client.tracking().increment(&self.tracking_id);

        if self.connectivity_precheck {
            let state = client.connectivity().state().await;
            if state != Connectivity::Online {
                tracing::warn!(
                    tracking_id = %record.tracking_id,
                    state = ?state,
                    "Connectivity precheck failed, request not sent"
                );
                self.handle_offline(&mut record, state).await;
                return record;
            }
        }

        let request = match self.prepare(&mut record).await {
            Ok(request) => request,
            Err(error) => {
                self.record_fault(&mut record, error, sink.as_ref());
                return record;
            }
        };

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            tracking_id = %record.tracking_id,
            "Executing HTTP request"
        );

        let started = Instant::now();
        let outcome = client.transport().send(request).await;
        record.elapsed = started.elapsed();

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                self.record_fault(&mut record, error, sink.as_ref());
                return record;
            }
        };

        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = record.elapsed.as_millis(),
            tracking_id = %record.tracking_id,
            "Received HTTP response"
        );

        record.status = Some(response.status);
        record.reason = response.reason.clone();
        record.headers = response.headers.clone();
        record.result_content = Some(response.text());

        let env = HookEnv {
            alerts: client.alerts(),
            sink: client.alert_sink(),
        };
        self.status_hooks
            .dispatch(response.status, &mut record, &env)
            .await;

        let succeeded = match &self.success_criteria {
            Some(criteria) => criteria(&response),
            None => response.is_success_status(),
        };

        if !succeeded {
            self.emit_metric(&record, sink.as_ref(), invocation);
            if let Some(on_failure) = self.on_failure.take() {
                on_failure(&mut record);
            }
            return record;
        }

        if let Err(error) = self.process_result(&mut record, &response) {
            self.record_fault(&mut record, error, sink.as_ref());
            return record;
        }

        record.succeeded = true;
        self.emit_metric(&record, sink.as_ref(), invocation);
        if let Some(on_success) = self.on_success.take() {
            on_success(&mut record);
        }

        record
    }

    /// Builds the outbound request: URL, headers, body and authorization.
    async fn prepare(&mut self, record: &mut ResultRecord<R, S>) -> Result<OutboundRequest> {
        let client = self.client;

        let url = client.resolve_url(&self.uri)?;
        let mut request = OutboundRequest::new(self.method.clone(), url);
        request.headers = client.default_headers().clone();
        self.headers.apply_to(&mut request.headers)?;

        self.content.validate()?;

        if let Some(payload) = record.send_object.as_ref() {
            let json = to_json(payload)?;
            let encoded = std::mem::take(&mut self.content).encode(payload, &json);
            record.send_content = Some(json);

            let body = encoded?;
            if let Some(content_type) = body.content_type {
                request.headers.insert(CONTENT_TYPE, content_type);
            }
            request.body = Some(body.bytes);
        }

        if self.authorization_required {
            let provider = match self.authorization.take() {
                Some(provider) => provider,
                None => client.default_authorization(),
            };
            auth::apply(provider.as_ref(), &mut request.headers).await?;
        }

        Ok(request)
    }

    /// Applies the result content transform, or the factory's decoding.
    fn process_result(
        &mut self,
        record: &mut ResultRecord<R, S>,
        response: &TransportResponse,
    ) -> Result<()> {
        if let Some(transform) = self.result_content.take() {
            return transform(record);
        }

        let content = record.result_content.as_deref().unwrap_or_default();
        if let Some(result) = self.factory.decode(content, &response.body, response.status)? {
            record.result_object = Some(result);
        }
        Ok(())
    }

    async fn handle_offline(&mut self, record: &mut ResultRecord<R, S>, state: Connectivity) {
        if let Some(on_offline) = self.on_offline.take() {
            on_offline(record, state);
            return;
        }

        let (kind, message) = match state {
            Connectivity::Unreachable => (AlertKind::PoorConnectivity, UNREACHABLE_MESSAGE),
            _ => (AlertKind::NoConnection, NO_CONNECTION_MESSAGE),
        };
        record.result_content = Some(message.to_string());

        let client = self.client;
        if client.alerts().try_fire(kind.key(), kind.cooldown()) {
            client
                .alert_sink()
                .display(Alert::new(kind, record.alert_context()))
                .await;
            record.alert_displayed = true;
        }
    }

    fn record_fault(&mut self, record: &mut ResultRecord<R, S>, error: Error, sink: &dyn LoggingSink) {
        tracing::warn!(
            error = %error,
            method = %self.method,
            uri = %self.uri,
            tracking_id = %record.tracking_id,
            "Request faulted"
        );

        let mut fault = Fault::new(error);
        fault.extend_context(self.call_properties(record));
        sink.fault(&fault);
        record.fault = Some(fault);

        if let Some(on_exception) = self.on_exception.take() {
            on_exception(record);
        }
    }

    fn emit_metric(&self, record: &ResultRecord<R, S>, sink: &dyn LoggingSink, invocation: u64) {
        let outcome = if record.succeeded {
            "Rest Call Succeeded"
        } else {
            "Rest Call Failed"
        };
        let event = format!("{} - {}", record.tracking_id, outcome);

        let mut properties = self.call_properties(record);
        properties.push(("invocation_count".to_string(), invocation.to_string()));
        sink.metric(&event, &properties);
    }

    /// Context shared by metrics and faults. Content is rendered for logging
    /// and never changes what the record stores.
    fn call_properties(&self, record: &ResultRecord<R, S>) -> Vec<(String, String)> {
        let excluded = self.exclude_content_logging;
        let mut properties = vec![
            ("tracking_id".to_string(), record.tracking_id.clone()),
            ("uri".to_string(), self.uri.clone()),
            ("method".to_string(), self.method.to_string()),
            (
                "elapsed_ms".to_string(),
                record.elapsed.as_millis().to_string(),
            ),
        ];

        if sends_body(&self.method) {
            let sent = record.send_content.as_deref();
            properties.push((
                "send_content".to_string(),
                content_log_text(sent, ContentSide::Sent, excluded),
            ));
            properties.push(("send_content_length".to_string(), char_len(sent)));
        }

        if let Some(status) = record.status {
            properties.push(("status".to_string(), status.as_u16().to_string()));
            properties.push(("status_text".to_string(), status_name(status)));
        }
        if let Some(reason) = &record.reason {
            properties.push(("reason".to_string(), reason.clone()));
        }

        let returned = record.result_content.as_deref();
        properties.push((
            "result_content".to_string(),
            content_log_text(returned, ContentSide::Returned, excluded),
        ));
        properties.push(("result_content_length".to_string(), char_len(returned)));

        if let Some(version) = self.client.app_version() {
            properties.push(("app_version".to_string(), version));
        }

        properties
    }
}

fn sends_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// `404` becomes `"NotFound"`. Unregistered codes keep their number.
fn status_name(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .split(|c: char| c.is_whitespace() || c == '-')
            .flat_map(|word| {
                let mut chars = word.chars().filter(|c| c.is_ascii_alphanumeric());
                let first = chars.next().map(|c| c.to_ascii_uppercase());
                first.into_iter().chain(chars)
            })
            .collect(),
        None => status.as_u16().to_string(),
    }
}

fn char_len(content: Option<&str>) -> String {
    content.map_or(0, |text| text.chars().count()).to_string()
}
