//! Integration tests using wiremock to simulate HTTP servers.

use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use parking_lot::Mutex;
use restbuilder::{
    Alert, AlertKind, AlertSink, ContentType, Error, Fault, LoggingSink, OutboundRequest,
    RequestBody, RestClient, StaticToken, StatusHook, Transport, TransportResponse,
};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
struct TestData {
    id: String,
}

#[derive(Debug, Serialize)]
struct Login {
    user: String,
    password: String,
}

#[derive(Default)]
struct CapturingSink {
    metrics: Mutex<Vec<(String, Vec<(String, String)>)>>,
    faults: Mutex<Vec<String>>,
}

impl CapturingSink {
    fn metric_value(&self, index: usize, key: &str) -> Option<String> {
        self.metrics.lock()[index]
            .1
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

impl LoggingSink for CapturingSink {
    fn metric(&self, event: &str, properties: &[(String, String)]) {
        self.metrics
            .lock()
            .push((event.to_string(), properties.to_vec()));
    }

    fn fault(&self, fault: &Fault) {
        self.faults.lock().push(fault.to_string());
    }
}

#[derive(Default)]
struct RecordingAlerts {
    shown: Mutex<Vec<Alert>>,
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn display(&self, alert: Alert) {
        self.shown.lock().push(alert);
    }
}

/// Answers every request with the same status and counts dispatches.
struct StatusTransport {
    status: StatusCode,
    sent: AtomicUsize,
}

#[async_trait]
impl Transport for StatusTransport {
    async fn send(&self, _request: OutboundRequest) -> restbuilder::Result<TransportResponse> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(TransportResponse::new(self.status, ""))
    }
}

fn client_for(server: &MockServer) -> RestClient {
    RestClient::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_post_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(body_json(serde_json::json!({ "id": "x" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(TestData {
            id: "x".to_string(),
        }))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let failures = AtomicUsize::new(0);

    let record = client
        .post::<TestData, _>("/items", TestData { id: "x".to_string() })
        .tracking_id("RB5001")
        .no_authorization()
        .on_failure(|_record| {
            failures.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert!(record.succeeded);
    assert_eq!(record.status, Some(StatusCode::OK));
    assert_eq!(
        record.result_object,
        Some(TestData {
            id: "x".to_string()
        })
    );
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert!(record.fault.is_none());
}

#[tokio::test]
async fn test_not_found_routes_to_failure_callback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not here"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let failures = AtomicUsize::new(0);
    let exceptions = AtomicUsize::new(0);

    let record = client
        .get::<TestData>("/missing")
        .tracking_id("RB5002")
        .no_authorization()
        .on_failure(|_record| {
            failures.fetch_add(1, Ordering::SeqCst);
        })
        .on_exception(|_record| {
            exceptions.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert!(!record.succeeded);
    assert_eq!(record.status, Some(StatusCode::NOT_FOUND));
    assert_eq!(record.result_content.as_deref(), Some("Not here"));
    assert_eq!(record.result_object, Some(TestData::default()));
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(exceptions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_criteria_rejects_ok_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(TestData {
            id: "accepted".to_string(),
        }))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let successes = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);
    let exceptions = AtomicUsize::new(0);

    let record = client
        .post::<TestData, _>("/orders", TestData { id: "new".to_string() })
        .tracking_id("RB5021")
        .no_authorization()
        .success_criteria(|response| response.status == StatusCode::CREATED)
        .on_success(|_record| {
            successes.fetch_add(1, Ordering::SeqCst);
        })
        .on_failure(|_record| {
            failures.fetch_add(1, Ordering::SeqCst);
        })
        .on_exception(|_record| {
            exceptions.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert!(!record.succeeded);
    assert!(record.fault.is_none());
    assert_eq!(record.status, Some(StatusCode::OK));
    assert_eq!(record.result_content.as_deref(), Some(r#"{"id":"accepted"}"#));
    assert_eq!(record.result_object, Some(TestData::default()));
    assert_eq!(successes.load(Ordering::SeqCst), 0);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(exceptions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_criteria_accepts_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lookup"))
        .respond_with(ResponseTemplate::new(404).set_body_json(TestData {
            id: "none".to_string(),
        }))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let successes = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);

    let record = client
        .get::<TestData>("/lookup")
        .tracking_id("RB5022")
        .no_authorization()
        .success_criteria(|response| {
            response.status.is_success() || response.status == StatusCode::NOT_FOUND
        })
        .on_success(|_record| {
            successes.fetch_add(1, Ordering::SeqCst);
        })
        .on_failure(|_record| {
            failures.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert!(record.succeeded);
    assert!(record.fault.is_none());
    assert_eq!(record.status, Some(StatusCode::NOT_FOUND));
    assert_eq!(
        record.result_object,
        Some(TestData {
            id: "none".to_string()
        })
    );
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_bearer_token_is_never_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let exceptions = AtomicUsize::new(0);

    let record = client
        .get_text("/secure")
        .tracking_id("RB5003")
        .authorization(Arc::new(StaticToken::bearer("")))
        .on_exception(|_record| {
            exceptions.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert_eq!(exceptions.load(Ordering::SeqCst), 1);
    assert!(!record.succeeded);
    assert!(matches!(
        record.fault.as_ref().map(Fault::error),
        Some(Error::ConfigurationError(_))
    ));
}

#[tokio::test]
async fn test_blank_tracking_id_is_never_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let exceptions = AtomicUsize::new(0);

    let record = client
        .get_text("/anything")
        .no_authorization()
        .on_exception(|_record| {
            exceptions.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert_eq!(exceptions.load(Ordering::SeqCst), 1);
    assert!(!record.succeeded);
    assert!(record.fault.unwrap().error().is_configuration());
}

#[tokio::test]
async fn test_sas_and_custom_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blob"))
        .and(header("authorization", "sv=2024&sig=abc"))
        .and(header("accept", "application/json"))
        .and(header("x-app", "mobile"))
        .and(header("x-tenant", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = RestClient::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("X-App", "mobile")
        .unwrap()
        .authorization(Arc::new(StaticToken::sas("sv=2024&sig=abc")))
        .build()
        .unwrap();

    let record = client
        .get_text("/blob")
        .tracking_id("RB5004")
        .header("X-Tenant", "a")
        .header("X-Tenant", "b")
        .execute()
        .await;

    assert!(record.succeeded);
    assert_eq!(record.result_content.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_form_url_encoded_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("user=alice&password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"session"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let record = client
        .post::<TestData, _>(
            "/token",
            Login {
                user: "alice".to_string(),
                password: "hunter2".to_string(),
            },
        )
        .tracking_id("RB5005")
        .no_authorization()
        .content_type(ContentType::FormUrlEncoded)
        .execute()
        .await;

    assert!(record.succeeded);
    assert_eq!(
        record.send_content.as_deref(),
        Some(r#"{"user":"alice","password":"hunter2"}"#)
    );
    assert_eq!(record.result_object.unwrap().id, "session");
}

#[tokio::test]
async fn test_custom_content_generator() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/note"))
        .and(header("content-type", "text/plain"))
        .and(body_string("note:x"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let record = client
        .put::<TestData, _>("/note", TestData { id: "x".to_string() })
        .tracking_id("RB5006")
        .no_authorization()
        .custom_content(|payload: &TestData, _json: &str| {
            Ok(RequestBody::new(
                format!("note:{}", payload.id),
                http::HeaderValue::from_static("text/plain"),
            ))
        })
        .execute()
        .await;

    assert!(record.succeeded);
    assert_eq!(record.result_object, Some(TestData::default()));
}

#[tokio::test]
async fn test_custom_content_type_without_generator() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let record = client
        .post::<TestData, _>("/items", TestData { id: "x".to_string() })
        .tracking_id("RB5007")
        .no_authorization()
        .content_type(ContentType::Custom)
        .execute()
        .await;

    assert!(record.fault.unwrap().error().is_configuration());
}

#[tokio::test]
async fn test_deserialization_error_keeps_raw_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let exceptions = AtomicUsize::new(0);

    let record = client
        .get::<TestData>("/bad")
        .tracking_id("RB5008")
        .no_authorization()
        .on_exception(|record| {
            assert!(record.fault.is_some());
            exceptions.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert!(!record.succeeded);
    assert_eq!(exceptions.load(Ordering::SeqCst), 1);

    let fault = record.fault.unwrap();
    assert_eq!(fault.error().raw_response(), Some("not json"));
    assert_eq!(fault.context_value("status"), Some("200"));
    assert_eq!(fault.context_value("tracking_id"), Some("RB5008"));
}

#[tokio::test]
async fn test_replaced_hook_runs_instead_of_builtin() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let alerts = Arc::new(RecordingAlerts::default());
    let client = RestClient::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .alert_sink(alerts.clone())
        .build()
        .unwrap();
    let hook_calls = AtomicUsize::new(0);

    let record = client
        .get_text("/down")
        .tracking_id("RB5009")
        .no_authorization()
        .on_status(StatusCode::SERVICE_UNAVAILABLE, |_record| {
            hook_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        })
        .execute()
        .await;

    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert!(!record.alert_displayed);
    assert!(alerts.shown.lock().is_empty());

    let record = client
        .get_text("/down")
        .tracking_id("RB5009")
        .no_authorization()
        .clear_status_hook(StatusCode::SERVICE_UNAVAILABLE)
        .execute()
        .await;

    assert!(!record.alert_displayed);
    assert!(alerts.shown.lock().is_empty());
    assert_eq!(client.tracking().count("RB5009"), 2);
}

#[tokio::test]
async fn test_forbidden_html_page_raises_alert() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("<!DOCTYPE html><html><body>Blocked</body></html>"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"error":"denied"}"#))
        .mount(&mock_server)
        .await;

    let alerts = Arc::new(RecordingAlerts::default());
    let client = RestClient::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .alert_sink(alerts.clone())
        .build()
        .unwrap();

    let api_denial = client
        .get_text("/json")
        .tracking_id("RB5010")
        .no_authorization()
        .execute()
        .await;
    assert!(!api_denial.alert_displayed);

    let html = client
        .get_text("/html")
        .tracking_id("RB5011")
        .no_authorization()
        .execute()
        .await;
    assert!(html.alert_displayed);
    assert!(!html.succeeded);

    let shown = alerts.shown.lock();
    assert_eq!(shown.len(), 1);
    assert_eq!(
        *shown,
        vec![Alert::new(AlertKind::ResourceUnavailable, "RB5011-403")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout_alert_cooldown() {
    let transport = Arc::new(StatusTransport {
        status: StatusCode::REQUEST_TIMEOUT,
        sent: AtomicUsize::new(0),
    });
    let alerts = Arc::new(RecordingAlerts::default());
    let client = RestClient::builder()
        .base_url("http://api.test")
        .unwrap()
        .transport(transport.clone())
        .alert_sink(alerts.clone())
        .build()
        .unwrap();

    let client = &client;
    let call = move || {
        client
            .get_text("/slow")
            .tracking_id("RB5012")
            .no_authorization()
            .execute()
    };

    let first = call().await;
    assert!(first.alert_displayed);

    tokio::time::advance(Duration::from_secs(60)).await;
    let second = call().await;
    assert!(!second.alert_displayed);

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    let third = call().await;
    assert!(third.alert_displayed);

    assert_eq!(transport.sent.load(Ordering::SeqCst), 3);
    let shown = alerts.shown.lock();
    assert_eq!(shown.len(), 2);
    assert!(shown
        .iter()
        .all(|alert| alert.kind == AlertKind::PoorConnectivity && alert.context == "RB5012-408"));
}

#[tokio::test(start_paused = true)]
async fn test_remapped_status_uses_its_own_alert_key() {
    let alerts = Arc::new(RecordingAlerts::default());
    let client = RestClient::builder()
        .transport(Arc::new(StatusTransport {
            status: StatusCode::REQUEST_TIMEOUT,
            sent: AtomicUsize::new(0),
        }))
        .alert_sink(alerts.clone())
        .build()
        .unwrap();

    let first = client
        .get_text("http://api.test/a")
        .tracking_id("RB5013")
        .no_authorization()
        .execute()
        .await;
    assert!(first.alert_displayed);

    // PoorConnectivity is cooling down, ServerUnavailable is not.
    let record = client
        .get_text("http://api.test/b")
        .tracking_id("RB5014")
        .no_authorization()
        .status_hook(StatusCode::REQUEST_TIMEOUT, StatusHook::ServerUnavailable)
        .execute()
        .await;
    assert!(record.alert_displayed);

    assert!(client.alerts().last_fired("PoorConnectivity").is_some());
    assert!(client.alerts().last_fired("ServerUnavailable").is_some());
    assert_eq!(alerts.shown.lock().len(), 2);
}

#[tokio::test]
async fn test_long_content_is_truncated_only_in_logs() {
    let mock_server = MockServer::start().await;
    let long_body = "a".repeat(1500);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(long_body.clone()))
        .mount(&mock_server)
        .await;

    let sink = Arc::new(CapturingSink::default());
    let client = RestClient::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .logging_sink(sink.clone())
        .build()
        .unwrap();

    let record = client
        .get_text("/long")
        .tracking_id("RB5015")
        .no_authorization()
        .execute()
        .await;

    assert_eq!(record.result_content.as_deref(), Some(long_body.as_str()));

    let logged = sink.metric_value(0, "result_content").unwrap();
    assert_eq!(logged.chars().count(), 1004);
    assert!(logged.ends_with(" ..."));
    assert_eq!(
        sink.metric_value(0, "result_content_length").as_deref(),
        Some("1500")
    );
    assert_eq!(sink.metrics.lock()[0].0, "RB5015 - Rest Call Succeeded");
}

#[tokio::test]
async fn test_per_call_logging_sink_overrides_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let default_sink = Arc::new(CapturingSink::default());
    let call_sink = Arc::new(CapturingSink::default());
    let client = client_for(&mock_server);
    client.set_default_logging_sink(default_sink.clone());

    client
        .delete("/items/1")
        .tracking_id("RB5016")
        .no_authorization()
        .logging_sink(call_sink.clone())
        .execute()
        .await;

    assert!(default_sink.metrics.lock().is_empty());
    assert_eq!(call_sink.metrics.lock()[0].0, "RB5016 - Rest Call Failed");
    assert_eq!(call_sink.metric_value(0, "status").as_deref(), Some("500"));
    assert!(call_sink.faults.lock().is_empty());
}

#[tokio::test]
async fn test_get_raw_returns_body_bytes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 159, 146, 150]))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let record = client
        .get_raw("/image")
        .tracking_id("RB5017")
        .no_authorization()
        .execute()
        .await;

    assert!(record.succeeded);
    assert_eq!(record.result_object.unwrap().as_ref(), &[0u8, 159, 146, 150]);
}

#[tokio::test]
async fn test_callback_panic_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let outcome = AssertUnwindSafe(
        client
            .get_text("/ok")
            .tracking_id("RB5018")
            .no_authorization()
            .on_success(|_record| panic!("callback failed"))
            .execute(),
    )
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_fault() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    drop(mock_server);

    let client = RestClient::builder()
        .base_url(uri)
        .unwrap()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let exceptions = AtomicUsize::new(0);

    let record = client
        .get_text("/gone")
        .tracking_id("RB5019")
        .no_authorization()
        .on_exception(|_record| {
            exceptions.fetch_add(1, Ordering::SeqCst);
        })
        .execute()
        .await;

    assert_eq!(exceptions.load(Ordering::SeqCst), 1);
    assert!(record.status.is_none());
    assert!(record.fault.unwrap().error().is_transport());
}
