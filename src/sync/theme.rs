//! Presentation theme synchronization.
//!
//! Flow Overview: `mount` moves the state to `Loading`, fetches the remote
//! configuration once (falling back to the built-in default on any failure,
//! without retrying) and subscribes to the update channel. Every apply replaces
//! the whole configuration and is checked against the handle's liveness flag,
//! so a fetch that resolves after `unmount` changes nothing.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{broadcast, RwLock},
    task::JoinHandle,
};
use tracing::{debug, instrument, warn};
use url::Url;

use super::SyncError;
use crate::gateway::upstream::endpoint_url;

pub const DEFAULT_THEME_PATH: &str = "/theme";
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Presentation variables plus the dark mode flag, always applied together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub variables: BTreeMap<String, String>,
    pub dark_mode: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        let variables = [
            ("background", "#ffffff"),
            ("foreground", "#111827"),
            ("primary", "#2563eb"),
            ("radius", "0.5rem"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

        Self {
            variables,
            dark_mode: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeOrigin {
    Remote,
    Default,
    Update,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemePhase {
    Uninitialized,
    Loading,
    Applied(ThemeOrigin),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActiveTheme {
    pub phase: ThemePhase,
    pub config: ThemeConfig,
}

impl Default for ActiveTheme {
    fn default() -> Self {
        Self {
            phase: ThemePhase::Uninitialized,
            config: ThemeConfig::default(),
        }
    }
}

pub trait ThemeSource: Send + Sync {
    fn fetch<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<ThemeConfig, SyncError>> + Send + 'a>>;
}

pub trait ThemeChannel {
    fn subscribe(&self) -> broadcast::Receiver<ThemeConfig>;
}

/// Reads the current configuration from `GET <backend><theme path>`.
#[derive(Clone, Debug)]
pub struct HttpThemeSource {
    client: Client,
    url: String,
}

impl HttpThemeSource {
    #[must_use]
    pub fn new(client: Client, backend_url: &Url, theme_path: &str) -> Self {
        Self {
            client,
            url: endpoint_url(backend_url, theme_path),
        }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn get_theme(&self) -> Result<ThemeConfig, SyncError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status));
        }
        Ok(response.json::<ThemeConfig>().await?)
    }
}

impl ThemeSource for HttpThemeSource {
    fn fetch<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<ThemeConfig, SyncError>> + Send + 'a>> {
        Box::pin(self.get_theme())
    }
}

/// In-process update channel; the backend pushes through the gateway.
#[derive(Clone, Debug)]
pub struct ThemeBroadcaster {
    sender: broadcast::Sender<ThemeConfig>,
}

impl ThemeBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many mounted subscribers received the update.
    pub fn publish(&self, config: ThemeConfig) -> usize {
        self.sender.send(config).unwrap_or(0)
    }
}

impl Default for ThemeBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeChannel for ThemeBroadcaster {
    fn subscribe(&self) -> broadcast::Receiver<ThemeConfig> {
        self.sender.subscribe()
    }
}

/// Shared view of the active theme.
#[derive(Clone, Debug, Default)]
pub struct ThemeSync {
    state: Arc<RwLock<ActiveTheme>>,
}

impl ThemeSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> ActiveTheme {
        self.state.read().await.clone()
    }

    /// Replace the active configuration wholesale, unless `live` is down.
    async fn apply_if_live(&self, live: &AtomicBool, config: ThemeConfig, origin: ThemeOrigin) -> bool {
        let mut active = self.state.write().await;
        if !live.load(Ordering::Acquire) {
            debug!("Discarding {origin:?} theme received after teardown");
            return false;
        }
        active.config = config;
        active.phase = ThemePhase::Applied(origin);
        true
    }

    /// Start the initial fetch and the update subscription.
    pub async fn mount<C>(&self, source: Arc<dyn ThemeSource>, channel: &C) -> ThemeHandle
    where
        C: ThemeChannel + ?Sized,
    {
        self.state.write().await.phase = ThemePhase::Loading;

        let live = Arc::new(AtomicBool::new(true));
        let mut updates = channel.subscribe();

        let initial = {
            let sync = self.clone();
            let live = Arc::clone(&live);
            tokio::spawn(async move {
                let (config, origin) = match source.fetch().await {
                    Ok(config) => (config, ThemeOrigin::Remote),
                    Err(err) => {
                        warn!("Theme fetch failed, applying defaults: {err}");
                        (ThemeConfig::default(), ThemeOrigin::Default)
                    }
                };
                sync.apply_if_live(&live, config, origin).await;
            })
        };

        let listener = {
            let sync = self.clone();
            let live = Arc::clone(&live);
            tokio::spawn(async move {
                loop {
                    match updates.recv().await {
                        Ok(config) => {
                            if !sync.apply_if_live(&live, config, ThemeOrigin::Update).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Theme listener lagged, skipped {skipped} updates");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        ThemeHandle {
            live,
            initial: Some(initial),
            listener,
        }
    }
}

/// Disposer for a mounted `ThemeSync`; dropping it tears the mount down.
#[derive(Debug)]
pub struct ThemeHandle {
    live: Arc<AtomicBool>,
    initial: Option<JoinHandle<()>>,
    listener: JoinHandle<()>,
}

impl ThemeHandle {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Wait for the initial fetch to be applied.
    pub async fn settled(&mut self) {
        if let Some(initial) = self.initial.take() {
            if let Err(err) = initial.await {
                warn!("Initial theme fetch task failed: {err}");
            }
        }
    }

    /// Stop honoring results and unsubscribe. The in-flight initial fetch, if
    /// any, is handed back; it is allowed to finish but can no longer apply.
    pub fn unmount(mut self) -> Option<JoinHandle<()>> {
        self.teardown();
        self.initial.take()
    }

    fn teardown(&self) {
        self.live.store(false, Ordering::Release);
        self.listener.abort();
    }
}

impl Drop for ThemeHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::net::TcpListener;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::sleep;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn remote_theme() -> ThemeConfig {
        ThemeConfig {
            variables: BTreeMap::from([
                ("primary".to_string(), "#e11d48".to_string()),
                ("background".to_string(), "#0f172a".to_string()),
            ]),
            dark_mode: true,
        }
    }

    struct StaticSource(Result<ThemeConfig, StatusCode>);

    impl ThemeSource for StaticSource {
        fn fetch<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<ThemeConfig, SyncError>> + Send + 'a>> {
            Box::pin(async move { self.0.clone().map_err(SyncError::Status) })
        }
    }

    /// Resolves only once released.
    struct GatedSource {
        gate: Arc<Notify>,
    }

    impl ThemeSource for GatedSource {
        fn fetch<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<ThemeConfig, SyncError>> + Send + 'a>> {
            Box::pin(async move {
                self.gate.notified().await;
                Ok(remote_theme())
            })
        }
    }

    async fn wait_for_phase(sync: &ThemeSync, phase: ThemePhase) -> ActiveTheme {
        for _ in 0..100 {
            let snapshot = sync.snapshot().await;
            if snapshot.phase == phase {
                return snapshot;
            }
            sleep(Duration::from_millis(10)).await;
        }
        sync.snapshot().await
    }

    #[tokio::test]
    async fn starts_uninitialized_with_default_config() {
        let snapshot = ThemeSync::new().snapshot().await;
        assert_eq!(snapshot.phase, ThemePhase::Uninitialized);
        assert_eq!(snapshot.config, ThemeConfig::default());
    }

    #[tokio::test]
    async fn successful_fetch_applies_remote_config() {
        let sync = ThemeSync::new();
        let channel = ThemeBroadcaster::new();
        let mut handle = sync
            .mount(Arc::new(StaticSource(Ok(remote_theme()))), &channel)
            .await;
        handle.settled().await;

        let snapshot = sync.snapshot().await;
        assert_eq!(snapshot.phase, ThemePhase::Applied(ThemeOrigin::Remote));
        assert_eq!(snapshot.config, remote_theme());
    }

    #[tokio::test]
    async fn failed_fetch_applies_default_then_update_replaces_it() {
        let sync = ThemeSync::new();
        let channel = ThemeBroadcaster::new();
        let mut handle = sync
            .mount(
                Arc::new(StaticSource(Err(StatusCode::SERVICE_UNAVAILABLE))),
                &channel,
            )
            .await;
        handle.settled().await;

        let snapshot = sync.snapshot().await;
        assert_eq!(snapshot.phase, ThemePhase::Applied(ThemeOrigin::Default));
        assert_eq!(snapshot.config, ThemeConfig::default());

        assert_eq!(channel.publish(remote_theme()), 1);
        let snapshot = wait_for_phase(&sync, ThemePhase::Applied(ThemeOrigin::Update)).await;

        // No partial merge: default-only variables are gone.
        assert_eq!(snapshot.config, remote_theme());
        assert!(!snapshot.config.variables.contains_key("radius"));
        assert!(handle.is_live());
    }

    #[tokio::test]
    async fn applying_the_same_config_twice_is_a_no_op() {
        let sync = ThemeSync::new();
        let live = AtomicBool::new(true);

        assert!(sync.apply_if_live(&live, remote_theme(), ThemeOrigin::Update).await);
        let first = sync.snapshot().await;
        assert!(sync.apply_if_live(&live, remote_theme(), ThemeOrigin::Update).await);
        let second = sync.snapshot().await;
        assert_eq!(first, second);

        live.store(false, Ordering::Release);
        assert!(!sync.apply_if_live(&live, ThemeConfig::default(), ThemeOrigin::Default).await);
        assert_eq!(sync.snapshot().await, second);
    }

    #[tokio::test]
    async fn fetch_resolving_after_unmount_is_discarded() {
        let sync = ThemeSync::new();
        let channel = ThemeBroadcaster::new();
        let gate = Arc::new(Notify::new());
        let handle = sync
            .mount(Arc::new(GatedSource { gate: Arc::clone(&gate) }), &channel)
            .await;

        let pending = handle.unmount().unwrap();
        gate.notify_one();
        pending.await.unwrap();

        let snapshot = sync.snapshot().await;
        assert_eq!(snapshot.phase, ThemePhase::Loading);
        assert_eq!(snapshot.config, ThemeConfig::default());
    }

    #[tokio::test]
    async fn updates_after_unmount_are_ignored() {
        let sync = ThemeSync::new();
        let channel = ThemeBroadcaster::new();
        let mut handle = sync
            .mount(Arc::new(StaticSource(Ok(ThemeConfig::default()))), &channel)
            .await;
        handle.settled().await;
        drop(handle);

        channel.publish(remote_theme());
        sleep(Duration::from_millis(50)).await;

        let snapshot = sync.snapshot().await;
        assert_eq!(snapshot.phase, ThemePhase::Applied(ThemeOrigin::Remote));
        assert_eq!(snapshot.config, ThemeConfig::default());
    }

    #[tokio::test]
    async fn http_source_reads_theme_from_backend() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "variables": { "primary": "#e11d48", "background": "#0f172a" },
                "dark_mode": true
            })))
            .mount(&server)
            .await;

        let source = HttpThemeSource::new(
            Client::new(),
            &Url::parse(&server.uri()).unwrap(),
            DEFAULT_THEME_PATH,
        );
        assert_eq!(source.fetch().await.unwrap(), remote_theme());
    }

    #[tokio::test]
    async fn malformed_theme_falls_back_to_default() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "variables": { "primary": "#e11d48" }
            })))
            .mount(&server)
            .await;

        let sync = ThemeSync::new();
        let source = HttpThemeSource::new(
            Client::new(),
            &Url::parse(&server.uri()).unwrap(),
            DEFAULT_THEME_PATH,
        );
        let mut handle = sync.mount(Arc::new(source), &ThemeBroadcaster::new()).await;
        handle.settled().await;

        let snapshot = sync.snapshot().await;
        assert_eq!(snapshot.phase, ThemePhase::Applied(ThemeOrigin::Default));
        assert_eq!(snapshot.config, ThemeConfig::default());
    }

    #[tokio::test]
    async fn network_error_falls_back_to_default() {
        let port = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener.local_addr().unwrap().port(),
            Err(_) => return,
        };
        let source = HttpThemeSource::new(
            Client::new(),
            &Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
            DEFAULT_THEME_PATH,
        );

        let sync = ThemeSync::new();
        let mut handle = sync.mount(Arc::new(source), &ThemeBroadcaster::new()).await;
        handle.settled().await;

        assert_eq!(sync.snapshot().await.config, ThemeConfig::default());
    }
}
