use anyhow::{Context, Result};
use parcelstore_client::{ApiResponse, CarrierApiClient, config::Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let client = CarrierApiClient::new(settings.carrier_config())?;

    println!("Carrier: {}", settings.carrier_code);
    println!("Store: {}", settings.store_id.as_deref().unwrap_or("default"));
    println!("================================");

    match client.fetch_pickup_points().await {
        Ok(ApiResponse::Structured(body)) => {
            let count = body
                .get("data")
                .and_then(|data| data.as_array())
                .map(Vec::len)
                .unwrap_or_default();
            println!("📍 Pickup points: {}", count);
        }
        Ok(other) => println!("📍 Unexpected pickup point response: {:?}", other),
        Err(e) => eprintln!("Pickup point lookup failed: {}", e),
    }

    match client.is_courier_coming() {
        Some(window) => {
            println!("🚚 Courier expected between {} and {}", window.start, window.end)
        }
        None => println!("ℹ️  No courier pickup scheduled"),
    }

    println!("================================");
    let log = client.audit_log_json().context("Failed to render audit log")?;
    println!("{}", log);

    Ok(())
}
