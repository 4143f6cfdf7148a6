//! Status-code hooks.
//!
//! A hook runs when a response arrives with a matching status code, after the
//! body is captured and before the success criteria are evaluated. Every call
//! starts with the built-in hooks registered:
//!
//! | Status | Hook |
//! |--------|------|
//! | 408 Request Timeout | [`StatusHook::PoorConnectivity`] |
//! | 504 Gateway Timeout | [`StatusHook::PoorConnectivity`] |
//! | 503 Service Unavailable | [`StatusHook::ServerUnavailable`] |
//! | 403 Forbidden | [`StatusHook::ForbiddenPage`] |
//!
//! Hooks raise alerts only. They never re-issue a request.

use crate::{
    alerts::{Alert, AlertKind, AlertSink, AlertWindow},
    ResultRecord,
};
use futures::future::BoxFuture;
use http::StatusCode;
use std::collections::HashMap;

/// Marker that identifies an HTML error page in a 403 body.
///
/// This is a literal substring match and is easily fooled (lowercase doctype,
/// leading whitespace in a JSON string, a proxy that omits the doctype).
pub const HTML_DOCTYPE_MARKER: &str = "<!DOCTYPE html>";

/// An async hook supplied by the caller.
pub type HookFn<'a, R, S> =
    Box<dyn for<'r> FnMut(&'r mut ResultRecord<R, S>) -> BoxFuture<'r, ()> + Send + 'a>;

/// What to do when a given status code arrives.
pub enum StatusHook<'a, R, S> {
    /// Raise [`AlertKind::PoorConnectivity`], at most once per 5 minutes.
    PoorConnectivity,
    /// Raise [`AlertKind::ServerUnavailable`], at most once per 10 minutes.
    ServerUnavailable,
    /// Raise [`AlertKind::ResourceUnavailable`] if the body is an HTML error
    /// page. Other bodies are left for the failure callback.
    ForbiddenPage,
    /// A caller-supplied hook.
    Custom(HookFn<'a, R, S>),
}

impl<'a, R, S> StatusHook<'a, R, S> {
    /// Wraps an async closure as a hook.
    pub fn custom<F>(hook: F) -> Self
    where
        F: for<'r> FnMut(&'r mut ResultRecord<R, S>) -> BoxFuture<'r, ()> + Send + 'a,
    {
        StatusHook::Custom(Box::new(hook))
    }

    /// Returns `true` for the hooks this crate provides.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, StatusHook::Custom(_))
    }

    pub(crate) async fn run(&mut self, record: &mut ResultRecord<R, S>, env: &HookEnv<'_>) {
        match self {
            StatusHook::PoorConnectivity => raise(AlertKind::PoorConnectivity, record, env).await,
            StatusHook::ServerUnavailable => raise(AlertKind::ServerUnavailable, record, env).await,
            StatusHook::ForbiddenPage => {
                let html_page = record
                    .result_content
                    .as_deref()
                    .is_some_and(looks_like_html_error_page);
                if html_page {
                    raise(AlertKind::ResourceUnavailable, record, env).await;
                }
            }
            StatusHook::Custom(hook) => hook(record).await,
        }
    }
}

impl<R, S> std::fmt::Debug for StatusHook<'_, R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusHook::PoorConnectivity => f.write_str("PoorConnectivity"),
            StatusHook::ServerUnavailable => f.write_str("ServerUnavailable"),
            StatusHook::ForbiddenPage => f.write_str("ForbiddenPage"),
            StatusHook::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Returns `true` if a response body looks like an HTML error page.
pub fn looks_like_html_error_page(body: &str) -> bool {
    body.contains(HTML_DOCTYPE_MARKER)
}

/// Shared state the built-in hooks need.
pub(crate) struct HookEnv<'e> {
    pub(crate) alerts: &'e AlertWindow,
    pub(crate) sink: &'e dyn AlertSink,
}

async fn raise<R, S>(kind: AlertKind, record: &mut ResultRecord<R, S>, env: &HookEnv<'_>) {
    if !env.alerts.try_fire(kind.key(), kind.cooldown()) {
        tracing::debug!(
            alert = kind.key(),
            tracking_id = %record.tracking_id,
            "Alert suppressed by cooldown"
        );
        return;
    }

    env.sink.display(Alert::new(kind, record.alert_context())).await;
    record.alert_displayed = true;
}

/// Status code to hook table for a single call.
#[derive(Debug)]
pub struct StatusHookRegistry<'a, R, S> {
    hooks: HashMap<StatusCode, StatusHook<'a, R, S>>,
}

impl<'a, R, S> StatusHookRegistry<'a, R, S> {
    /// A registry seeded with the built-in hooks.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(StatusCode::REQUEST_TIMEOUT, StatusHook::PoorConnectivity);
        registry.register(StatusCode::GATEWAY_TIMEOUT, StatusHook::PoorConnectivity);
        registry.register(StatusCode::FORBIDDEN, StatusHook::ForbiddenPage);
        registry.register(StatusCode::SERVICE_UNAVAILABLE, StatusHook::ServerUnavailable);
        registry
    }

    /// A registry with no hooks at all.
    pub fn empty() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Sets the hook for `status`, returning the one it replaced.
    pub fn register(
        &mut self,
        status: StatusCode,
        hook: StatusHook<'a, R, S>,
    ) -> Option<StatusHook<'a, R, S>> {
        self.hooks.insert(status, hook)
    }

    /// Removes the hook for `status`, built-in or custom.
    pub fn clear(&mut self, status: StatusCode) -> Option<StatusHook<'a, R, S>> {
        self.hooks.remove(&status)
    }

    /// The hook registered for `status`.
    pub fn get(&self, status: StatusCode) -> Option<&StatusHook<'a, R, S>> {
        self.hooks.get(&status)
    }

    /// Returns `true` if a hook is registered for `status`.
    pub fn contains(&self, status: StatusCode) -> bool {
        self.hooks.contains_key(&status)
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs the hook for `status`, if any. Returns whether one ran.
    pub(crate) async fn dispatch(
        &mut self,
        status: StatusCode,
        record: &mut ResultRecord<R, S>,
        env: &HookEnv<'_>,
    ) -> bool {
        match self.hooks.get_mut(&status) {
            Some(hook) => {
                tracing::debug!(
                    status = status.as_u16(),
                    hook = ?hook,
                    tracking_id = %record.tracking_id,
                    "Running status hook"
                );
                hook.run(record, env).await;
                true
            }
            None => false,
        }
    }
}

impl<R, S> Default for StatusHookRegistry<'_, R, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        shown: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn display(&self, alert: Alert) {
            self.shown.lock().push(alert);
        }
    }

    fn record(status: StatusCode, body: &str) -> ResultRecord<String, ()> {
        let mut record = ResultRecord::new("RB2001", None, None);
        record.status = Some(status);
        record.result_content = Some(body.to_string());
        record
    }

    #[test]
    fn test_builtins_are_seeded() {
        let registry = StatusHookRegistry::<String, ()>::new();

        assert_eq!(registry.len(), 4);
        assert!(matches!(
            registry.get(StatusCode::REQUEST_TIMEOUT),
            Some(StatusHook::PoorConnectivity)
        ));
        assert!(matches!(
            registry.get(StatusCode::GATEWAY_TIMEOUT),
            Some(StatusHook::PoorConnectivity)
        ));
        assert!(matches!(
            registry.get(StatusCode::SERVICE_UNAVAILABLE),
            Some(StatusHook::ServerUnavailable)
        ));
        assert!(matches!(
            registry.get(StatusCode::FORBIDDEN),
            Some(StatusHook::ForbiddenPage)
        ));
        assert!(StatusHookRegistry::<String, ()>::empty().is_empty());
    }

    #[test]
    fn test_register_replaces_and_clear_removes() {
        let mut registry = StatusHookRegistry::<String, ()>::new();

        let previous = registry.register(
            StatusCode::SERVICE_UNAVAILABLE,
            StatusHook::custom(|_record| Box::pin(async {})),
        );
        assert!(previous.unwrap().is_builtin());
        assert!(!registry
            .get(StatusCode::SERVICE_UNAVAILABLE)
            .unwrap()
            .is_builtin());

        assert!(registry.clear(StatusCode::FORBIDDEN).is_some());
        assert!(!registry.contains(StatusCode::FORBIDDEN));
        assert!(registry.clear(StatusCode::FORBIDDEN).is_none());
    }

    #[tokio::test]
    async fn test_forbidden_only_alerts_for_html_pages() {
        let alerts = AlertWindow::new();
        let sink = RecordingSink::default();
        let env = HookEnv {
            alerts: &alerts,
            sink: &sink,
        };
        let mut registry = StatusHookRegistry::new();

        let mut api_denial = record(StatusCode::FORBIDDEN, r#"{"error":"forbidden"}"#);
        assert!(registry.dispatch(StatusCode::FORBIDDEN, &mut api_denial, &env).await);
        assert!(!api_denial.alert_displayed);

        let mut html = record(
            StatusCode::FORBIDDEN,
            "<!DOCTYPE html><html><body>Site down</body></html>",
        );
        registry.dispatch(StatusCode::FORBIDDEN, &mut html, &env).await;
        assert!(html.alert_displayed);

        let shown = sink.shown.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].kind, AlertKind::ResourceUnavailable);
        assert_eq!(shown[0].context, "RB2001-403");
    }

    #[tokio::test]
    async fn test_server_unavailable_respects_cooldown() {
        let alerts = AlertWindow::new();
        let sink = RecordingSink::default();
        let env = HookEnv {
            alerts: &alerts,
            sink: &sink,
        };
        let mut registry = StatusHookRegistry::new();

        let mut first = record(StatusCode::SERVICE_UNAVAILABLE, "");
        let mut second = record(StatusCode::SERVICE_UNAVAILABLE, "");
        registry
            .dispatch(StatusCode::SERVICE_UNAVAILABLE, &mut first, &env)
            .await;
        registry
            .dispatch(StatusCode::SERVICE_UNAVAILABLE, &mut second, &env)
            .await;

        assert!(first.alert_displayed);
        assert!(!second.alert_displayed);
        assert_eq!(sink.shown.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_hook_can_mutate_record() {
        let alerts = AlertWindow::new();
        let sink = RecordingSink::default();
        let env = HookEnv {
            alerts: &alerts,
            sink: &sink,
        };
        let mut registry = StatusHookRegistry::new();
        registry.register(
            StatusCode::TOO_MANY_REQUESTS,
            StatusHook::custom(|record: &mut ResultRecord<String, ()>| {
                Box::pin(async move {
                    record.result_object = Some("throttled".to_string());
                })
            }),
        );

        let mut throttled = record(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(registry
            .dispatch(StatusCode::TOO_MANY_REQUESTS, &mut throttled, &env)
            .await);
        assert_eq!(throttled.result_object.as_deref(), Some("throttled"));
        assert!(!registry
            .dispatch(StatusCode::NOT_FOUND, &mut throttled, &env)
            .await);
    }

    #[test]
    fn test_html_marker_is_literal() {
        assert!(looks_like_html_error_page("<!DOCTYPE html><html></html>"));
        assert!(!looks_like_html_error_page("<!doctype html><html></html>"));
    }
}
