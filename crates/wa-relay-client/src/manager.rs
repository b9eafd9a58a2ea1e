//! The connection lifecycle manager.
//!
//! `LifecycleManager` owns the single active client handle and the state
//! derived from its events. Request handlers read it through `is_ready`,
//! `current_pairing_code` and `handle`; the only operations that mutate it
//! from outside are `initialize` (once, at startup) and `restart`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::auth::{AuthStrategy, LocalAuth, ResilientAuth};
use crate::client::{ClientFactory, ClientHandle, ClientOptions};
use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, EventSink};
use crate::lifecycle::{self, ConnectionState};
use crate::session::SessionDir;
use crate::supervise::report_background_error;
use crate::types::LifecycleConfig;

/// Mutable connection state shared with the event dispatcher.
struct Inner {
    state: ConnectionState,
    pairing_code: Option<String>,
    handle: Option<ClientHandle>,
    /// Bumped whenever a handle is installed or retired. Dispatchers for
    /// older generations drop their events.
    generation: u64,
    /// Resolves the pending `initialize`/`restart` call. Dropping it reports
    /// the handle as retired.
    ready_tx: Option<oneshot::Sender<Result<()>>>,
}

impl Inner {
    fn resolve(&mut self, outcome: Result<()>) {
        if let Some(tx) = self.ready_tx.take() {
            let _ = tx.send(outcome);
        }
    }

    fn enter(&mut self, next: ConnectionState) {
        debug_assert!(
            lifecycle::is_valid_transition(self.state, next),
            "invalid connection transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(from = ?self.state, to = ?next, "Connection state changed");
        self.state = next;
    }
}

/// Follow-up work the dispatcher runs after releasing the lock.
enum Effect {
    None,
    ReleaseBrowser(ClientHandle),
}

/// A freshly launched handle whose readiness has not been observed yet.
struct PendingReady {
    handle: ClientHandle,
    ready: oneshot::Receiver<Result<()>>,
}

impl PendingReady {
    async fn wait(self) -> Result<ClientHandle> {
        match self.ready.await {
            Ok(Ok(())) => Ok(self.handle),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ClientError::Retired),
        }
    }
}

/// Owns the active automation client and tracks its connection state.
pub struct LifecycleManager {
    factory: Arc<dyn ClientFactory>,
    auth: Arc<dyn AuthStrategy>,
    session: SessionDir,
    options: ClientOptions,
    config: LifecycleConfig,
    inner: Arc<Mutex<Inner>>,
    /// Serializes handle swaps. Not held while waiting for readiness.
    swap: tokio::sync::Mutex<()>,
}

impl LifecycleManager {
    /// Create a manager using local credential storage in `session`.
    #[must_use]
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        session: SessionDir,
        options: ClientOptions,
        config: LifecycleConfig,
    ) -> Self {
        let auth = LocalAuth::new(session.clone());
        Self::with_auth_strategy(factory, auth, session, options, config)
    }

    /// Create a manager with a custom credential strategy.
    ///
    /// The strategy is wrapped in [`ResilientAuth`], so its logout errors
    /// never reach the client.
    #[must_use]
    pub fn with_auth_strategy<A>(
        factory: Arc<dyn ClientFactory>,
        auth: A,
        session: SessionDir,
        options: ClientOptions,
        config: LifecycleConfig,
    ) -> Self
    where
        A: AuthStrategy + 'static,
    {
        let auth: Arc<dyn AuthStrategy> = Arc::new(ResilientAuth::new(auth, session.clone()));
        Self {
            factory,
            auth,
            session,
            options,
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Uninitialized,
                pairing_code: None,
                handle: None,
                generation: 0,
                ready_tx: None,
            })),
            swap: tokio::sync::Mutex::new(()),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Get the session directory.
    #[must_use]
    pub const fn session(&self) -> &SessionDir {
        &self.session
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Returns true only while the active handle is ready to send.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        lifecycle::accepts_messages(self.state())
    }

    /// The pairing code currently on display, if the client is awaiting pairing.
    #[must_use]
    pub fn current_pairing_code(&self) -> Option<String> {
        let inner = self.inner.lock();
        if lifecycle::exposes_pairing_code(inner.state) {
            inner.pairing_code.clone()
        } else {
            None
        }
    }

    /// The active client handle, if one is installed.
    #[must_use]
    pub fn handle(&self) -> Option<ClientHandle> {
        self.inner.lock().handle.clone()
    }

    /// Start the client at process startup.
    ///
    /// Finishes any session cleanup deferred by a previous run, creates the
    /// handle and resolves once the client reports ready. Call this once;
    /// use [`restart`](Self::restart) afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AuthFailure` if the client rejects the session,
    /// or `ClientError::Retired` if the handle is replaced before it is ready.
    pub async fn initialize(&self) -> Result<ClientHandle> {
        tracing::info!("Starting WhatsApp client");

        let pending = {
            let _swap = self.swap.lock().await;
            self.session
                .cleanup_if_marked(
                    self.config.cleanup_retries,
                    self.config.cleanup_retry_delay(),
                )
                .await;
            if lifecycle::has_live_handle(self.state()) {
                tracing::warn!("initialize called with a live client; retiring it first");
                self.retire().await;
            }
            self.launch().await?
        };

        pending.wait().await
    }

    /// Replace the active client with a fresh one.
    ///
    /// The old handle gets a bounded clean teardown and is force-closed if
    /// that fails or times out. After a settle delay a new handle is created;
    /// the call resolves once it is ready. There is no retry beyond this one
    /// attempt.
    ///
    /// # Errors
    ///
    /// Returns the error of the new handle's initialization.
    pub async fn restart(&self) -> Result<ClientHandle> {
        tracing::info!("Restarting WhatsApp client");

        let launched = {
            let _swap = self.swap.lock().await;
            self.retire().await;
            tokio::time::sleep(self.config.settle_delay()).await;
            self.launch().await
        };

        let result = match launched {
            Ok(pending) => pending.wait().await,
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            tracing::error!(error = %err, "Failed to reinitialize WhatsApp client");
        }
        result
    }

    /// Create, install and start a new handle.
    async fn launch(&self) -> Result<PendingReady> {
        self.auth.prepare().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = self
            .factory
            .create(&self.options, EventSink::new(tx), Arc::clone(&self.auth))?;

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.handle = Some(Arc::clone(&handle));
            inner.pairing_code = None;
            inner.ready_tx = Some(ready_tx);
            inner.enter(ConnectionState::Initializing);
            inner.generation
        };

        tokio::spawn(dispatch(Arc::clone(&self.inner), generation, rx));

        // A client that fails to start never emits ready; fail the waiter instead
        let starting = Arc::clone(&handle);
        let shared = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(err) = starting.initialize().await {
                report_background_error("client initialize", &err);
                let mut inner = shared.lock();
                if inner.generation == generation {
                    if inner.state != ConnectionState::Disconnected {
                        inner.pairing_code = None;
                        inner.enter(ConnectionState::Disconnected);
                    }
                    inner.resolve(Err(err));
                }
            }
        });

        Ok(PendingReady {
            handle,
            ready: ready_rx,
        })
    }

    /// Tear down the active handle, if any, and reset to `Uninitialized`.
    ///
    /// Cancel-safe: if the caller stops polling mid-teardown, the state is
    /// still reset and the browser is closed in the background.
    async fn retire(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.pairing_code = None;
            inner.ready_tx = None;
            let previous = inner.handle.take();
            if previous.is_some() {
                inner.enter(ConnectionState::Terminated);
            }
            previous
        };

        let mut retirement = Retirement {
            inner: Arc::clone(&self.inner),
            pending: previous.clone(),
        };

        if let Some(handle) = previous {
            let timeout = self.config.teardown_timeout();
            match tokio::time::timeout(timeout, handle.destroy()).await {
                Ok(Ok(())) => tracing::info!("Previous client destroyed"),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "Client teardown failed; forcing shutdown");
                    force_close(&handle).await;
                }
                Err(_) => {
                    tracing::warn!(?timeout, "Client teardown timed out; forcing shutdown");
                    force_close(&handle).await;
                }
            }
        }

        retirement.pending = None;
    }
}

/// Resets the state to `Uninitialized` when a retirement ends, however it ends.
struct Retirement {
    inner: Arc<Mutex<Inner>>,
    /// The handle still being torn down. Set only while teardown is in flight.
    pending: Option<ClientHandle>,
}

impl Drop for Retirement {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            tracing::warn!("Client teardown cancelled; closing browser in the background");
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move { force_close(&handle).await });
            }
        }

        let mut inner = self.inner.lock();
        inner.pairing_code = None;
        inner.enter(ConnectionState::Uninitialized);
    }
}

async fn force_close(handle: &ClientHandle) {
    if let Err(err) = handle.close_browser().await {
        tracing::warn!(error = %err, "Error closing browser");
    }
}

/// Apply events from one handle until it is retired or its sink is dropped.
async fn dispatch(
    inner: Arc<Mutex<Inner>>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
) {
    while let Some(event) = events.recv().await {
        let effect = {
            let mut guard = inner.lock();
            if guard.generation != generation {
                tracing::debug!(event = event.name(), "Dropping event from retired client");
                break;
            }
            apply(&mut guard, event)
        };

        if let Effect::ReleaseBrowser(handle) = effect {
            if let Err(err) = handle.close_browser().await {
                tracing::debug!(error = %err, "Ignoring error while closing browser");
            }
        }
    }
}

/// Apply one event to the connection state.
fn apply(inner: &mut Inner, event: ClientEvent) -> Effect {
    let next = lifecycle::transition(inner.state, &event);

    match event {
        ClientEvent::Qr(code) => {
            if next.is_none() {
                tracing::debug!(state = ?inner.state, "Ignoring pairing code");
                return Effect::None;
            }
            tracing::info!("Pairing code received; scan it from the QR endpoint");
            inner.pairing_code = Some(code);
            inner.enter(ConnectionState::AwaitingPairing);
            Effect::None
        }
        ClientEvent::LoadingScreen { percent, message } => {
            tracing::info!(percent, detail = %message, "Loading WhatsApp");
            Effect::None
        }
        ClientEvent::Authenticated => {
            tracing::info!("Session authenticated");
            Effect::None
        }
        ClientEvent::AuthFailure(message) => {
            tracing::error!(detail = %message, "Authentication failed");
            if let Some(next) = next {
                inner.pairing_code = None;
                inner.enter(next);
            }
            inner.resolve(Err(ClientError::AuthFailure(message)));
            Effect::None
        }
        ClientEvent::Ready => {
            if next.is_none() {
                return Effect::None;
            }
            tracing::info!("WhatsApp client connected and ready");
            inner.pairing_code = None;
            inner.enter(ConnectionState::Ready);
            inner.resolve(Ok(()));
            Effect::None
        }
        ClientEvent::Disconnected(reason) => {
            tracing::warn!(reason = %reason, "WhatsApp client disconnected");
            if reason == "NAVIGATION" {
                tracing::info!("Session was closed from the phone");
            }
            let Some(next) = next else {
                return Effect::None;
            };
            inner.pairing_code = None;
            inner.enter(next);
            inner
                .handle
                .clone()
                .map_or(Effect::None, Effect::ReleaseBrowser)
        }
        ClientEvent::Error(message) => {
            tracing::error!(detail = %message, "Client error");
            Effect::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{wait_until, DestroyBehavior, FakeClientFactory};
    use std::io;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_config() -> LifecycleConfig {
        LifecycleConfig {
            teardown_timeout_ms: 50,
            settle_delay_ms: 5,
            cleanup_retries: 3,
            cleanup_retry_delay_ms: 5,
        }
    }

    fn manager_with(factory: &Arc<FakeClientFactory>, dir: &TempDir) -> LifecycleManager {
        let session = SessionDir::new(dir.path().join("session"));
        let options = ClientOptions::new(session.path());
        let factory: Arc<dyn ClientFactory> = Arc::clone(factory) as Arc<dyn ClientFactory>;
        LifecycleManager::new(factory, session, options, fast_config())
    }

    #[tokio::test]
    async fn starts_uninitialized() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::silent());
        let manager = manager_with(&factory, &dir);

        assert_eq!(manager.state(), ConnectionState::Uninitialized);
        assert!(!manager.is_ready());
        assert!(manager.current_pairing_code().is_none());
        assert!(manager.handle().is_none());
    }

    #[tokio::test]
    async fn initialize_resolves_on_ready() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);

        let handle = manager.initialize().await.unwrap();

        assert!(manager.is_ready());
        assert!(manager.current_pairing_code().is_none());
        let active = manager.handle().unwrap();
        assert!(Arc::ptr_eq(&handle, &active));
        assert_eq!(factory.created().len(), 1);
    }

    #[tokio::test]
    async fn pairing_code_rotates_then_clears_on_ready() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::pairing("code-1"));
        let manager = Arc::new(manager_with(&factory, &dir));

        let init = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.initialize().await.map(|_| ()) }
        });

        wait_until(|| manager.state() == ConnectionState::AwaitingPairing).await;
        assert_eq!(manager.current_pairing_code().as_deref(), Some("code-1"));
        assert!(!manager.is_ready());

        let client = factory.latest().unwrap();
        client.emit(ClientEvent::Qr("code-2".into()));
        wait_until(|| manager.current_pairing_code().as_deref() == Some("code-2")).await;

        client.emit(ClientEvent::Ready);
        init.await.unwrap().unwrap();
        assert!(manager.is_ready());
        assert!(manager.current_pairing_code().is_none());
    }

    #[tokio::test]
    async fn auth_failure_rejects_initialize() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::scripted(vec![ClientEvent::AuthFailure(
            "session expired".into(),
        )]));
        let manager = manager_with(&factory, &dir);

        let err = manager.initialize().await.err().unwrap();
        assert!(matches!(err, ClientError::AuthFailure(msg) if msg == "session expired"));
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn disconnect_clears_ready_and_releases_browser() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        let client = factory.latest().unwrap();
        client.emit(ClientEvent::Disconnected("NAVIGATION".into()));

        wait_until(|| manager.state() == ConnectionState::Disconnected).await;
        assert!(!manager.is_ready());
        assert!(manager.current_pairing_code().is_none());
        wait_until(|| client.browser_closed()).await;
    }

    #[tokio::test]
    async fn late_pairing_code_does_not_unready() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        let client = factory.latest().unwrap();
        client.emit(ClientEvent::Qr("stray".into()));
        client.emit(ClientEvent::Authenticated);
        // Flush the dispatcher with an event we can observe
        client.emit(ClientEvent::Error("noise".into()));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(manager.is_ready());
        assert!(manager.current_pairing_code().is_none());
    }

    #[tokio::test]
    async fn restart_replaces_handle() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);
        let first = manager.initialize().await.unwrap();

        let second = manager.restart().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &manager.handle().unwrap()));
        assert!(manager.is_ready());

        let created = factory.created();
        assert_eq!(created.len(), 2);
        assert!(created[0].destroyed());
        assert!(!created[0].browser_closed());
    }

    #[tokio::test]
    async fn restart_forces_browser_close_when_teardown_hangs() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        factory.set_destroy_behavior(DestroyBehavior::Hang);
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        factory.set_destroy_behavior(DestroyBehavior::Clean);
        manager.restart().await.unwrap();

        let created = factory.created();
        assert!(created[0].browser_closed());
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn cancelled_restart_resets_state() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        factory.set_destroy_behavior(DestroyBehavior::Hang);
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        // Give up while the 50ms teardown budget is still running
        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), manager.restart()).await;
        assert!(cancelled.is_err());

        assert_eq!(manager.state(), ConnectionState::Uninitialized);
        assert!(manager.handle().is_none());
        let first = Arc::clone(&factory.created()[0]);
        wait_until(|| first.browser_closed()).await;

        factory.set_destroy_behavior(DestroyBehavior::Clean);
        manager.initialize().await.unwrap();
        assert!(manager.is_ready());
        assert_eq!(factory.created().len(), 2);
    }

    #[tokio::test]
    async fn restart_forces_browser_close_when_teardown_fails() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        factory.set_destroy_behavior(DestroyBehavior::Fail);
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        manager.restart().await.unwrap();

        assert!(factory.created()[0].browser_closed());
    }

    #[tokio::test]
    async fn events_from_retired_handle_are_ignored() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();
        manager.restart().await.unwrap();

        let old = Arc::clone(&factory.created()[0]);
        old.emit(ClientEvent::Disconnected("LOGOUT".into()));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn restart_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        factory.set_script(vec![ClientEvent::AuthFailure("banned".into())]);
        let err = manager.restart().await.err().unwrap();

        assert!(matches!(err, ClientError::AuthFailure(_)));
        assert!(!manager.is_ready());
        assert_eq!(factory.created().len(), 2);
    }

    #[tokio::test]
    async fn client_start_failure_rejects_initialize() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        factory.set_initialize_error(Some("connection refused"));
        let manager = manager_with(&factory, &dir);

        let err = manager.initialize().await.err().unwrap();

        assert!(matches!(err, ClientError::Bridge(ref msg) if msg == "connection refused"));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.current_pairing_code().is_none());

        // A later restart recovers once the host is reachable
        factory.set_initialize_error(None);
        manager.restart().await.unwrap();
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn superseded_restart_reports_retired() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::silent());
        let manager = Arc::new(manager_with(&factory, &dir));

        let first = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.restart().await.map(|_| ()) }
        });
        wait_until(|| factory.created().len() == 1).await;

        factory.set_script(vec![ClientEvent::Ready]);
        manager.restart().await.unwrap();

        assert!(matches!(first.await.unwrap(), Err(ClientError::Retired)));
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn busy_logout_during_restart_is_deferred() {
        struct BusyAuth;

        #[async_trait::async_trait]
        impl AuthStrategy for BusyAuth {
            async fn prepare(&self) -> Result<()> {
                Ok(())
            }

            async fn logout(&self) -> Result<()> {
                Err(ClientError::Io(io::Error::new(
                    io::ErrorKind::ResourceBusy,
                    "resource busy or locked",
                )))
            }
        }

        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        factory.set_logout_on_destroy(true);
        let session = SessionDir::new(dir.path().join("session"));
        let manager = LifecycleManager::with_auth_strategy(
            Arc::clone(&factory) as Arc<dyn ClientFactory>,
            BusyAuth,
            session.clone(),
            ClientOptions::new(session.path()),
            fast_config(),
        );
        manager.initialize().await.unwrap();

        manager.restart().await.unwrap();

        assert!(session.needs_cleanup());
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn startup_cleans_marked_session_before_creating_handle() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);

        let session = manager.session().clone();
        std::fs::create_dir_all(session.path()).unwrap();
        std::fs::write(session.path().join("stale-creds"), "x").unwrap();
        session.mark_for_cleanup().unwrap();

        manager.initialize().await.unwrap();

        assert!(!session.needs_cleanup());
        assert!(!session.path().join("stale-creds").exists());
        // LocalAuth recreates the empty directory for the new handle
        assert!(session.path().is_dir());
        assert_eq!(factory.created().len(), 1);
    }

    #[tokio::test]
    async fn restart_leaves_marker_for_next_startup() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(FakeClientFactory::ready());
        let manager = manager_with(&factory, &dir);
        manager.initialize().await.unwrap();

        manager.session().mark_for_cleanup().unwrap();
        manager.restart().await.unwrap();

        assert!(manager.session().needs_cleanup());
    }
}
