//! User-facing alerts and their cooldowns.
//!
//! Built-in status hooks raise alerts through an [`AlertSink`]. An
//! [`AlertWindow`] shared by every call on a client keeps each alert key quiet
//! for its cooldown after it last fired.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// The conditions that can raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// The connectivity precheck reported no connection.
    NoConnection,
    /// Request or gateway timeout, or an unreachable network.
    PoorConnectivity,
    /// The service answered 503.
    ServerUnavailable,
    /// A 403 that carried an HTML error page rather than an API response.
    ResourceUnavailable,
}

impl AlertKind {
    /// The suppression key shared by every alert of this kind.
    pub fn key(&self) -> &'static str {
        match self {
            AlertKind::NoConnection => "NoConnection",
            AlertKind::PoorConnectivity => "PoorConnectivity",
            AlertKind::ServerUnavailable => "ServerUnavailable",
            AlertKind::ResourceUnavailable => "ResourceUnavailable",
        }
    }

    /// How long the alert stays quiet after firing.
    pub fn cooldown(&self) -> Duration {
        match self {
            AlertKind::PoorConnectivity => Duration::from_secs(5 * 60),
            AlertKind::ServerUnavailable => Duration::from_secs(10 * 60),
            AlertKind::NoConnection | AlertKind::ResourceUnavailable => Duration::ZERO,
        }
    }
}

/// An alert ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// What happened.
    pub kind: AlertKind,
    /// `"<tracking id>-<status code>"`, or just the tracking id before dispatch.
    pub context: String,
}

impl Alert {
    /// Creates an alert.
    pub fn new(kind: AlertKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
        }
    }
}

/// Shows alerts to the user.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Displays the alert. May suspend until the user dismisses it.
    async fn display(&self, alert: Alert);
}

/// Writes alerts to the log instead of showing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn display(&self, alert: Alert) {
        tracing::warn!(
            target: "restbuilder",
            alert = alert.kind.key(),
            context = %alert.context,
            "Alert raised"
        );
    }
}

/// Last-fired timestamps per alert key.
///
/// Uses the `tokio` clock so cooldowns can be driven by a paused runtime in tests.
#[derive(Debug, Default)]
pub struct AlertWindow {
    last_fired: Mutex<HashMap<String, Instant>>,
}

impl AlertWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `key` now unless it fired less than `cooldown` ago.
    ///
    /// Returns `true` if the alert should be shown. A suppressed attempt does
    /// not extend the cooldown.
    pub fn try_fire(&self, key: &str, cooldown: Duration) -> bool {
        self.try_fire_at(key, cooldown, Instant::now())
    }

    /// [`try_fire`](Self::try_fire) with an explicit clock reading.
    ///
    /// # Examples
    ///
    /// ```
    /// use restbuilder::alerts::AlertWindow;
    /// use std::time::Duration;
    /// use tokio::time::Instant;
    ///
    /// let window = AlertWindow::new();
    /// let cooldown = Duration::from_secs(300);
    /// let start = Instant::now();
    ///
    /// assert!(window.try_fire_at("PoorConnectivity", cooldown, start));
    /// assert!(!window.try_fire_at("PoorConnectivity", cooldown, start + Duration::from_secs(60)));
    /// assert!(window.try_fire_at("PoorConnectivity", cooldown, start + Duration::from_secs(301)));
    /// ```
    pub fn try_fire_at(&self, key: &str, cooldown: Duration, now: Instant) -> bool {
        let mut last_fired = self.last_fired.lock();

        if let Some(previous) = last_fired.get(key) {
            if now.saturating_duration_since(*previous) < cooldown {
                return false;
            }
        }

        last_fired.insert(key.to_string(), now);
        true
    }

    /// When `key` last fired, if ever.
    pub fn last_fired(&self, key: &str) -> Option<Instant> {
        self.last_fired.lock().get(key).copied()
    }

    /// Forgets every timestamp.
    pub fn clear(&self) {
        self.last_fired.lock().clear();
    }
}
