//! wa-relay - WhatsApp REST relay
//!
//! This is the main entry point for the relay service. It serves the HTTP API
//! and drives the WhatsApp client through the automation host.
//!
//! # Configuration
//!
//! Settings come from the environment, optionally seeded from a `.env` file:
//! `PORT`, `BASE_URL`, `HISTORY_DB_PATH`, `AUTOMATION_URL`, `CHROME_PATH`,
//! `SESSION_DIR` and `RUST_LOG`.
//!
//! Without `HISTORY_DB_PATH` the relay runs without a send history.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wa_relay_client::{
    is_resource_busy_message, spawn_supervised, BridgeClientFactory, ClientOptions,
    LifecycleConfig, LifecycleManager, SessionDir,
};
use wa_relay_gateway::{create_router, ExitRestarter, GatewayConfig, GatewayState};
use wa_relay_store::RocksHistoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wa_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = dotenv {
        if !err.not_found() {
            tracing::warn!(error = %err, "Could not load .env file");
        }
    }

    install_panic_hook();

    tracing::info!("Starting wa-relay");

    let config = GatewayConfig::from_env()?;
    let base_url = config.base_url();

    tracing::info!(
        listen_addr = %config.listen_addr(),
        base_url = %base_url,
        automation_url = %config.automation_url,
        session_dir = %config.session_dir.display(),
        history_db_path = ?config.history_db_path,
        "Configuration loaded"
    );

    // Open the send history; the relay keeps working without it
    let history = match &config.history_db_path {
        Some(path) => match RocksHistoryStore::open(path) {
            Ok(store) => {
                tracing::info!(path = %path.display(), "History database opened");
                Some(Arc::new(store))
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Could not open history database; running without history"
                );
                None
            }
        },
        None => {
            tracing::warn!("HISTORY_DB_PATH not set; running without history");
            None
        }
    };

    // Lifecycle manager for the WhatsApp client
    let factory = Arc::new(BridgeClientFactory::new(config.automation_url.as_str())?);
    let session = SessionDir::new(&config.session_dir);
    let options =
        ClientOptions::new(session.path()).with_executable_path(config.chrome_path.clone());
    let manager = Arc::new(LifecycleManager::new(
        factory,
        session,
        options,
        LifecycleConfig::default(),
    ));

    let listen_addr = config.listen_addr();
    let state = GatewayState::new(
        Arc::clone(&manager),
        history,
        Arc::new(ExitRestarter),
        config,
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(url = %base_url, "HTTP server listening");
    tracing::info!(url = %format!("{base_url}/api-docs"), "API documentation");
    tracing::info!(url = %format!("{base_url}/api/messages/qr"), "Scan the QR code here");
    tracing::info!(url = %format!("POST {base_url}/api/messages/send"), "Send messages");
    tracing::info!(url = %format!("GET {base_url}/api/history"), "Message history");

    // The client starts in the background so the QR endpoint is reachable meanwhile
    spawn_supervised("client startup", async move {
        manager.initialize().await.map(|_| ())
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("wa-relay stopped");
    Ok(())
}

/// Log panics through tracing. Panicking tasks do not take the server down.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_default();
        let location = info.location().map(ToString::to_string).unwrap_or_default();

        tracing::error!(panic = %payload, location = %location, "Unhandled panic");
        if is_resource_busy_message(&payload) {
            tracing::info!("Locked session files detected; the server keeps running");
            tracing::info!("To reconnect, open the QR endpoint or restart the server");
        }
    }));
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down WhatsApp relay");
}
