//! In-process fakes for exercising the lifecycle manager without a browser.
//!
//! Only available with the `test-utils` feature or in this crate's tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wa_relay_core::ChatId;

use crate::auth::AuthStrategy;
use crate::client::{AutomationClient, ClientFactory, ClientHandle, ClientOptions};
use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, EventSink};

/// How a [`FakeClient`] responds to `destroy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyBehavior {
    /// Shut down cleanly.
    Clean,
    /// Return an error.
    Fail,
    /// Never complete.
    Hang,
}

/// A scripted automation client.
pub struct FakeClient {
    events: EventSink,
    auth: Arc<dyn AuthStrategy>,
    script: Vec<ClientEvent>,
    destroy_behavior: DestroyBehavior,
    logout_on_destroy: bool,
    initialize_error: Option<String>,
    send_delay: Duration,
    send_error: Option<String>,
    sent: Mutex<Vec<(ChatId, String)>>,
    destroyed: AtomicBool,
    browser_closed: AtomicBool,
}

impl FakeClient {
    /// Emit an event as if the automation host had reported it.
    pub fn emit(&self, event: ClientEvent) -> bool {
        self.events.emit(event)
    }

    /// Messages accepted by this client, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().clone()
    }

    /// Returns true if `destroy` completed cleanly.
    #[must_use]
    pub fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Returns true if the browser was force-closed.
    #[must_use]
    pub fn browser_closed(&self) -> bool {
        self.browser_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AutomationClient for FakeClient {
    async fn initialize(&self) -> Result<()> {
        if let Some(err) = &self.initialize_error {
            return Err(ClientError::Bridge(err.clone()));
        }
        for event in &self.script {
            self.events.emit(event.clone());
        }
        Ok(())
    }

    async fn send_message(&self, chat_id: &ChatId, body: &str) -> Result<()> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if let Some(err) = &self.send_error {
            return Err(ClientError::Send(err.clone()));
        }
        self.sent.lock().push((chat_id.clone(), body.to_string()));
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        if self.logout_on_destroy {
            self.auth.logout().await?;
        }
        match self.destroy_behavior {
            DestroyBehavior::Clean => {
                self.destroyed.store(true, Ordering::SeqCst);
                Ok(())
            }
            DestroyBehavior::Fail => Err(ClientError::Bridge("destroy failed".into())),
            DestroyBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn close_browser(&self) -> Result<()> {
        self.browser_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Creates [`FakeClient`]s and keeps every instance it created.
///
/// Settings apply to clients created after they are changed.
pub struct FakeClientFactory {
    script: Mutex<Vec<ClientEvent>>,
    destroy_behavior: Mutex<DestroyBehavior>,
    logout_on_destroy: AtomicBool,
    initialize_error: Mutex<Option<String>>,
    send_delay: Mutex<Duration>,
    send_error: Mutex<Option<String>>,
    created: Mutex<Vec<Arc<FakeClient>>>,
}

impl FakeClientFactory {
    /// Clients emit `events` when initialized.
    #[must_use]
    pub fn scripted(events: Vec<ClientEvent>) -> Self {
        Self {
            script: Mutex::new(events),
            destroy_behavior: Mutex::new(DestroyBehavior::Clean),
            logout_on_destroy: AtomicBool::new(false),
            initialize_error: Mutex::new(None),
            send_delay: Mutex::new(Duration::ZERO),
            send_error: Mutex::new(None),
            created: Mutex::new(Vec::new()),
        }
    }

    /// Clients become ready right away, as with a stored session.
    #[must_use]
    pub fn ready() -> Self {
        Self::scripted(vec![
            ClientEvent::Authenticated,
            ClientEvent::Ready,
        ])
    }

    /// Clients show `code` and wait to be paired.
    #[must_use]
    pub fn pairing(code: &str) -> Self {
        Self::scripted(vec![ClientEvent::Qr(code.to_string())])
    }

    /// Clients emit nothing.
    #[must_use]
    pub fn silent() -> Self {
        Self::scripted(Vec::new())
    }

    /// Replace the events emitted by new clients.
    pub fn set_script(&self, events: Vec<ClientEvent>) {
        *self.script.lock() = events;
    }

    /// Change how new clients respond to `destroy`.
    pub fn set_destroy_behavior(&self, behavior: DestroyBehavior) {
        *self.destroy_behavior.lock() = behavior;
    }

    /// Make new clients log out through their auth strategy on `destroy`.
    pub fn set_logout_on_destroy(&self, enabled: bool) {
        self.logout_on_destroy.store(enabled, Ordering::SeqCst);
    }

    /// Make new clients fail to start with `error`.
    pub fn set_initialize_error(&self, error: Option<&str>) {
        *self.initialize_error.lock() = error.map(str::to_string);
    }

    /// Make new clients take `delay` to complete each send.
    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = delay;
    }

    /// Make new clients fail every send with `error`.
    pub fn set_send_error(&self, error: Option<&str>) {
        *self.send_error.lock() = error.map(str::to_string);
    }

    /// Every client created so far, oldest first.
    #[must_use]
    pub fn created(&self) -> Vec<Arc<FakeClient>> {
        self.created.lock().clone()
    }

    /// The most recently created client.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<FakeClient>> {
        self.created.lock().last().cloned()
    }
}

impl ClientFactory for FakeClientFactory {
    fn create(
        &self,
        _options: &ClientOptions,
        events: EventSink,
        auth: Arc<dyn AuthStrategy>,
    ) -> Result<ClientHandle> {
        let client = Arc::new(FakeClient {
            events,
            auth,
            script: self.script.lock().clone(),
            destroy_behavior: *self.destroy_behavior.lock(),
            logout_on_destroy: self.logout_on_destroy.load(Ordering::SeqCst),
            initialize_error: self.initialize_error.lock().clone(),
            send_delay: *self.send_delay.lock(),
            send_error: self.send_error.lock().clone(),
            sent: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            browser_closed: AtomicBool::new(false),
        });
        self.created.lock().push(Arc::clone(&client));
        Ok(client)
    }
}

/// Poll `condition` until it holds.
///
/// # Panics
///
/// Panics if the condition does not hold within two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
