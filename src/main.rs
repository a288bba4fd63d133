//! Chat Broker - Entry Point
//!
//! Starts the broker, the WebSocket listener and the HTTP API, and stops
//! the broker on Ctrl-C.

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_broker::{api, handle_connection, AppError, BrokerHandle, ChatServer, Config};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_broker=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_broker=info")),
        )
        .init();

    let config = Config::from_env();

    let ws_listener = TcpListener::bind(&config.ws_addr).await?;
    info!("WebSocket endpoint listening on {}", config.ws_addr);
    let http_listener = TcpListener::bind(&config.http_addr).await?;
    info!("HTTP API listening on {}", config.http_addr);

    let (broker, router_task) = ChatServer::start(&config);
    info!("ChatServer actor started");

    let app = api::router(broker.clone());
    let http_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = accept_loop(ws_listener, broker.clone()) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
        }
    }

    http_task.abort();
    broker.announce("Broker shutting down").await?;
    broker.shutdown().await?;
    let _ = router_task.await;
    Ok(())
}

/// Connection accept loop
async fn accept_loop(listener: TcpListener, broker: BrokerHandle) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let broker = broker.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, broker).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
