//! Client example demonstrating the converter flow against a running server.
//!
//! Run with: cargo run -p converter-app --example client_example --no-default-features --features sqlite

use converter_client::ConverterClient;
use converter_hex::{ConverterService, inbound::HttpServer};
use converter_repo::build_repo;
use exchange_rates::FixedRateProvider;
use std::net::SocketAddr;
use tempfile::tempdir;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();
    drop(listener);

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("converter.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on port {port}...");
    println!("   Database: {db_url}");

    // Build repository (handles connection and migration)
    let repo = build_repo(&db_url).await?;

    // Start server in background with deterministic rates
    let service = ConverterService::new(repo, FixedRateProvider::new());
    let server = HttpServer::new(service);
    let router = server.router();

    let server_addr = format!("127.0.0.1:{port}");
    tokio::spawn(async move {
        axum::serve(
            TcpListener::bind(&server_addr).await.unwrap(),
            router.into_make_service(),
        )
        .await
        .unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let base_url = format!("http://127.0.0.1:{port}");
    let client = ConverterClient::new(&base_url);

    let health = client.health().await?;
    println!("✅ Server health: {health}");

    let response = client.convert("USD", "EUR", 10).await;
    assert!(response.is_err());
    println!("✅ Unauthorized without key: {}", response.unwrap_err());

    let issued = client.bootstrap("alice@example.com").await?;
    println!("✅ Bootstrap user: {} key={}", issued.user.email, issued.api_key);

    let client = client.with_api_key(issued.api_key);

    let usd = client
        .create_converter("Travel money", "USD", "alice@example.com")
        .await?;
    println!("✅ Created converter: {} {} (id={})", usd.title, usd.code, usd.id);

    let duplicate = client
        .create_converter("Again", "usd", "alice@example.com")
        .await;
    println!("✅ Duplicate rejected: {}", duplicate.unwrap_err());

    let detail = client.get_converter(usd.id).await?;
    println!("\n📋 Rates for {}:", detail.code);
    for rate in &detail.rate {
        println!("   - {}: {}", rate.code, rate.currency_rate);
    }

    let refreshed = client.update_converter(usd.id, "USD").await?;
    println!("✅ Refreshed at {}", refreshed.changed);

    let result = client.convert("USD", "CNY", 200).await?;
    println!("✅ {}", result.converter);

    let missing = client.convert("EUR", "USD", 5).await;
    println!("✅ No EUR converter: {}", missing.unwrap_err());

    println!("\n🎉 Example completed successfully!");

    Ok(())
}
