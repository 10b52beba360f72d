//! txnwire probe: ask a transaction coordinator for a producer id.
//!
//! Environment:
//! - TXNWIRE_BOOTSTRAP (default 127.0.0.1:9092): coordinator address
//! - TXNWIRE_TRANSACTIONAL_ID: transactional id (unset = idempotent producer)
//! - TXNWIRE_TRANSACTION_TIMEOUT_MS: timeout (unset = no bound)
//! - TXNWIRE_CLIENT_ID, TXNWIRE_CONNECT_TIMEOUT_MS, TXNWIRE_REQUEST_TIMEOUT_MS
//!
//! Prints the response as JSON.

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use txnwire::{
    ApiKey, Client, ClientConfig, InitProducerIdRequestBuilder, RequestBuilder, TcpTransport,
    NO_TRANSACTION_TIMEOUT_MS,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("txnwire=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    let bootstrap =
        std::env::var("TXNWIRE_BOOTSTRAP").unwrap_or_else(|_| "127.0.0.1:9092".to_string());
    let transactional_id = std::env::var("TXNWIRE_TRANSACTIONAL_ID").ok();
    let timeout_ms = match std::env::var("TXNWIRE_TRANSACTION_TIMEOUT_MS") {
        Ok(raw) => raw
            .parse::<i32>()
            .with_context(|| format!("TXNWIRE_TRANSACTION_TIMEOUT_MS is not an int32: {}", raw))?,
        Err(_) => NO_TRANSACTION_TIMEOUT_MS,
    };

    let builder = InitProducerIdRequestBuilder::with_timeout(transactional_id.as_deref(), timeout_ms)?;
    let client = Client::new(TcpTransport::new(&config), config);

    let version = client
        .negotiate_version(&bootstrap, ApiKey::InitProducerId)?
        .unwrap_or(0);
    tracing::info!(%bootstrap, version, request = %builder, "sending InitProducerId");

    let request = builder.build_for(version, client.registry())?;
    let response = client.send(&bootstrap, &request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
