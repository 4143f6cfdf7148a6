//! Basic example demonstrating GET and POST calls.
//!
//! This example shows how to:
//! - Create a client with basic configuration
//! - Configure a call with a tracking id and callbacks
//! - Send a JSON payload
//! - Read the result record
//!
//! Run with: `cargo run --example basic_call`

use restbuilder::{Error, RestClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("restbuilder=debug,basic_call=info")
        .init();

    // Create a client for the JSONPlaceholder API
    let client = RestClient::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .app_version(env!("CARGO_PKG_VERSION"))
        .build()?;

    println!("=== GET Call Example ===");
    let record = client
        .get::<Post>("/posts/1")
        .tracking_id("RB0001")
        .no_authorization()
        .on_failure(|record| println!("Server said no: {:?}", record.status))
        .execute()
        .await;

    if let Some(post) = &record.result_object {
        println!("Post ID: {}", post.id);
        println!("Title: {}", post.title);
    }
    println!("Succeeded: {}", record.succeeded);
    println!("Elapsed: {:?}", record.elapsed);
    println!("Status code: {:?}", record.status);
    println!();

    println!("=== POST Call Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let record = client
        .post::<Post, _>("/posts", new_post)
        .tracking_id("RB0002")
        .no_authorization()
        .on_success(|record| {
            if let Some(post) = &record.result_object {
                println!("Created post ID: {}", post.id);
            }
        })
        .on_exception(|record| {
            if let Some(fault) = &record.fault {
                eprintln!("Call faulted: {}", fault);
            }
        })
        .execute()
        .await;

    println!("Sent: {}", record.send_content.as_deref().unwrap_or_default());
    println!("Content-Type: {:?}", record.header("content-type"));
    println!();

    println!("=== Tracking ===");
    client
        .get_text("/posts/2")
        .tracking_id("RB0001")
        .no_authorization()
        .execute()
        .await;
    println!(
        "RB0001 has run {} times",
        client.tracking().count("RB0001")
    );

    Ok(())
}
