//! Example demonstrating status hooks and alert cooldowns.
//!
//! This example shows how to:
//! - Show alerts through a custom alert sink
//! - Replace a built-in status hook with a custom one
//! - Map an extra status code to a built-in hook
//! - Watch the alert window suppress repeated alerts
//!
//! Run with: `cargo run --example status_hooks`

use async_trait::async_trait;
use http::StatusCode;
use restbuilder::{Alert, AlertSink, Error, RestClient, StatusHook};
use std::sync::Arc;

struct ConsoleAlerts;

#[async_trait]
impl AlertSink for ConsoleAlerts {
    async fn display(&self, alert: Alert) {
        println!("!! ALERT {:?} ({})", alert.kind, alert.context);
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restbuilder=debug,status_hooks=info")
        .init();

    let client = RestClient::builder()
        .base_url("https://httpbin.org")?
        .alert_sink(Arc::new(ConsoleAlerts))
        .build()?;

    println!("=== Built-in 503 hook ===");
    for attempt in 1..=2 {
        let record = client
            .get_text("/status/503")
            .tracking_id("RB0101")
            .no_authorization()
            .execute()
            .await;
        // The second alert falls inside the 10 minute cooldown.
        println!("Attempt {}: alert shown = {}", attempt, record.alert_displayed);
    }
    println!();

    println!("=== Custom 429 hook ===");
    let record = client
        .get_text("/status/429")
        .tracking_id("RB0102")
        .no_authorization()
        .on_status(StatusCode::TOO_MANY_REQUESTS, |record| {
            Box::pin(async move {
                let retry_after = record.header("retry-after").unwrap_or("unknown").to_string();
                println!("Throttled, retry after {}", retry_after);
            })
        })
        .execute()
        .await;
    println!("Succeeded: {}", record.succeeded);
    println!();

    println!("=== 502 treated like a 503 ===");
    let record = client
        .get_text("/status/502")
        .tracking_id("RB0103")
        .no_authorization()
        .status_hook(StatusCode::BAD_GATEWAY, StatusHook::ServerUnavailable)
        .execute()
        .await;
    // Still suppressed: ServerUnavailable fired moments ago.
    println!("Alert shown = {}", record.alert_displayed);

    println!(
        "ServerUnavailable last fired: {:?}",
        client.alerts().last_fired("ServerUnavailable")
    );

    Ok(())
}
