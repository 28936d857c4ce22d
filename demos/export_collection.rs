//! Exports a broker collection as JSON lines.
//!
//! This example shows how to:
//! - Build a client from a `ClientConfig` with the exporter defaults
//! - Confirm connectivity and the API version with `/about/api`
//! - Walk a paginated collection page by page
//! - Treat a missing parent object as an empty export
//!
//! Run with:
//! `cargo run --example export_collection -- http://localhost:8080/SEMP/v2/config admin admin /msgVpns/default/queues`

use semp_client::{Client, ClientBuilder, ClientConfig, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("semp_client=debug,export_collection=info")
        .init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8080/SEMP/v2/config".to_string());
    let username = args.next().unwrap_or_else(|| "admin".to_string());
    let password = args.next().unwrap_or_else(|| "admin".to_string());
    let collection = args
        .next()
        .unwrap_or_else(|| "/msgVpns/default/queues".to_string());

    let config = ClientConfig::exporter(url).with_basic_auth(username, password);
    let client: Client = ClientBuilder::from_config(&config)?.build()?;

    let about = client.about_api().await?;
    tracing::info!(
        semp_version = %about.semp_version,
        platform = %about.platform,
        "Connection successful"
    );

    let mut pages = client.pages(format!("{}?count=100", collection));
    let mut exported = 0;
    loop {
        match pages.next_page().await {
            Ok(Some(items)) => {
                for item in items {
                    println!("{}", item);
                    exported += 1;
                }
            }
            Ok(None) => break,
            Err(e) if e.is_not_found() => {
                tracing::info!(collection = %collection, "Parent object not found, nothing to export");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(exported, pages = pages.pages_fetched(), "Export complete");
    Ok(())
}
