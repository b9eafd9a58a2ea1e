//! HTTP/WebSocket bridge to the automation host.
//!
//! The automation host drives the browser running WhatsApp Web. It exposes a
//! small REST API for commands and a WebSocket stream of lifecycle events:
//!
//! - `POST /client/initialize` starts a browser session
//! - `POST /client/messages` sends a text message
//! - `POST /client/destroy` shuts the session down cleanly
//! - `POST /client/browser/close` kills the browser process
//! - `WS /client/events` streams [`ClientEvent`]s as JSON text frames

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use wa_relay_core::ChatId;

use crate::auth::AuthStrategy;
use crate::client::{AutomationClient, ClientFactory, ClientHandle, ClientOptions};
use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, EventSink};

/// Disconnect reasons after which the stored credentials are no longer valid.
const LOGGED_OUT_REASONS: [&str; 2] = ["LOGOUT", "NAVIGATION"];

/// Creates [`BridgeClient`]s talking to one automation host.
#[derive(Debug, Clone)]
pub struct BridgeClientFactory {
    http: reqwest::Client,
    base_url: String,
}

impl BridgeClientFactory {
    /// Create a factory for the automation host at `base_url`
    /// (e.g., "http://127.0.0.1:3100").
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Bridge` if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Initializing a browser session can take a while
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Bridge(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(http, base_url))
    }

    /// Create a factory with a custom reqwest client.
    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Get the base URL of the automation host.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ClientFactory for BridgeClientFactory {
    fn create(
        &self,
        options: &ClientOptions,
        events: EventSink,
        auth: Arc<dyn AuthStrategy>,
    ) -> Result<ClientHandle> {
        Ok(Arc::new(BridgeClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            options: options.clone(),
            events,
            auth,
            pump: Mutex::new(None),
        }))
    }
}

/// One browser session on the automation host.
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    options: ClientOptions,
    events: EventSink,
    auth: Arc<dyn AuthStrategy>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// Request body for starting a session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeRequest<'a> {
    session_dir: String,
    executable_path: Option<String>,
    headless: bool,
    args: &'a [String],
}

/// Request body for sending a message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    chat_id: &'a str,
    body: &'a str,
}

/// Error response from the automation host.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl BridgeClient {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST `body` to `path`, turning a non-success response into its error message.
    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Bridge(format!("Automation host request failed: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let error = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("Automation host returned status {status}"));

        tracing::debug!(path, status = %status, error = %error, "Automation host rejected request");
        Err(ClientError::Bridge(error))
    }

    fn stop_pump(&self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

#[async_trait]
impl AutomationClient for BridgeClient {
    async fn initialize(&self) -> Result<()> {
        let ws_url = to_ws_url(&self.url("/client/events"));
        let (stream, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| ClientError::Bridge(format!("Event stream connection failed: {e}")))?;

        let pump = tokio::spawn(pump_events(
            stream,
            self.events.clone(),
            Arc::clone(&self.auth),
        ));
        if let Some(previous) = self.pump.lock().replace(pump) {
            previous.abort();
        }

        let request = InitializeRequest {
            session_dir: self.options.session_dir.display().to_string(),
            executable_path: self
                .options
                .executable_path
                .as_ref()
                .map(|p| p.display().to_string()),
            headless: self.options.headless,
            args: &self.options.browser_args,
        };
        self.post("/client/initialize", &request).await?;

        tracing::debug!(url = %self.base_url, "Automation client initializing");
        Ok(())
    }

    async fn send_message(&self, chat_id: &ChatId, body: &str) -> Result<()> {
        let request = SendRequest {
            chat_id: chat_id.as_str(),
            body,
        };
        self.post("/client/messages", &request)
            .await
            .map_err(|e| match e {
                ClientError::Bridge(msg) => ClientError::Send(msg),
                other => other,
            })
    }

    async fn destroy(&self) -> Result<()> {
        self.stop_pump();
        self.post("/client/destroy", &serde_json::json!({})).await
    }

    async fn close_browser(&self) -> Result<()> {
        self.stop_pump();
        self.post("/client/browser/close", &serde_json::json!({}))
            .await
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.stop_pump();
    }
}

/// Forward events from the host's WebSocket stream into the sink.
async fn pump_events<S>(mut stream: S, events: EventSink, auth: Arc<dyn AuthStrategy>)
where
    S: futures::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if let ClientEvent::Disconnected(reason) = &event {
                        if LOGGED_OUT_REASONS.contains(&reason.as_str()) {
                            // Never fails: the auth strategy defers locked files
                            let _ = auth.logout().await;
                        }
                    }
                    if !events.emit(event) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, text = %text, "Failed to parse automation event");
                }
            },
            Ok(Message::Close(_)) => {
                events.emit(ClientEvent::Disconnected("event stream closed".into()));
                return;
            }
            // Ignore control frames and binary messages
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_) | Message::Binary(_)) => {}
            Err(e) => {
                events.emit(ClientEvent::Error(format!("Event stream error: {e}")));
                events.emit(ClientEvent::Disconnected("event stream lost".into()));
                return;
            }
        }
    }
}

/// Convert an HTTP(S) URL to the matching WebSocket URL.
fn to_ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}
