//! # jazz-node
//!
//! The node binary: load configuration, build the containers behind one
//! [`jazz_node::service::Services`] context, and serve the easy interface
//! over HTTP until ctrl-c (SPEC §5 "service `shut_down` stops accepting new
//! requests, waits for in-flight ones to finish, then releases resources in
//! reverse initialisation order").

use std::sync::Arc;

use anyhow::{Context, Result};

use jazz_node::http;
use jazz_node::service::Services;
use jazz_types::Config;

#[tokio::main]
async fn main() -> Result<()> {
    jazz_types::logger::init("info");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "jazz.conf".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;

    let bind_host = config.get_string_or("HTTP_BIND", "0.0.0.0");
    let bind_port: u16 = config
        .get_string_or("HTTP_PORT", "8080")
        .parse()
        .context("HTTP_PORT is not a valid port number")?;

    let services = Arc::new(Services::build(config).context("building containers")?);
    let router = http::router(services.clone());

    let addr = format!("{bind_host}:{bind_port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding HTTP listener on {addr}"))?;
    tracing::info!(%addr, "jazz node listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    services.release();
    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("ctrl-c received, shutting down");
}
