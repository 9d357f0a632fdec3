//! Client-side synchronization for the fractional real-estate homepage.
//!
//! Two services keep UI-facing state in step with the backend:
//!
//! * [`HomepageDataService`] caches the homepage [`ContentSnapshot`], honours
//!   per-section manual overrides, and polls live data.
//! * [`ProtocolSyncService`] owns the staking protocol registry in local
//!   storage and keeps its aggregate stats current.
//!
//! View adapters in [`views`] subscribe to either service and expose
//! display-ready data.
//!
//! # Quick start
//!
//! ```no_run
//! use homepage_sync::HomepageSdk;
//!
//! # async fn example() -> homepage_sync::Result<()> {
//! let sdk = HomepageSdk::builder()
//!     .base_url("https://api.example.com")
//!     .build()?;
//!
//! let snapshot = sdk.homepage().get_homepage_data().await;
//! println!("{} properties listed", snapshot.market_stats.total_properties);
//!
//! sdk.start_auto_refresh();
//! let stats = sdk.protocols().get_stats();
//! println!("highest APY {}%", stats.highest_apy);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod subscribers;
pub mod transport;
pub mod views;

pub use error::{Result, SyncError};
pub use models::{ContentSnapshot, OverrideFlags, ProtocolRecord, ProtocolStats, Section};
pub use services::{HomepageDataService, OverrideSync, ProtocolSyncService};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use subscribers::Subscription;
pub use transport::{HttpTransport, Method, OfflineTransport, Transport};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// HomepageSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`HomepageSdk`] instance.
///
/// Use [`HomepageSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](HomepageSdkBuilder::build).
pub struct HomepageSdkBuilder {
    base_url: String,
    storage_dir: Option<PathBuf>,
    offline: bool,
    in_memory: bool,
    timeout: Duration,
    cache_ttl: Duration,
    refresh_interval: Duration,
    transport: Option<Arc<dyn Transport>>,
    storage: Option<Arc<dyn Storage>>,
}

impl Default for HomepageSdkBuilder {
    fn default() -> Self {
        Self {
            base_url: config::DEFAULT_BASE_URL.to_string(),
            storage_dir: None,
            offline: false,
            in_memory: false,
            timeout: config::DEFAULT_TIMEOUT,
            cache_ttl: config::DEFAULT_CACHE_TTL,
            refresh_interval: config::DEFAULT_REFRESH_INTERVAL,
            transport: None,
            storage: None,
        }
    }
}

impl HomepageSdkBuilder {
    /// Backend origin, e.g. `https://api.example.com`. The `/api/homepage`
    /// base path is appended per request.
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Directory for persisted state.
    ///
    /// If not set, a platform data directory is used (e.g.
    /// `~/.local/share/homepage-sync` on Linux).
    pub fn storage_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.storage_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Keep all persisted state in memory for this process only.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Never contact the backend; run from stored state and defaults.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long a fetched snapshot is served before refetching. Defaults to
    /// 5 minutes.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Live-data polling period. Defaults to 30 seconds.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Use a custom transport instead of HTTP.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom storage adapter.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Apply `HOMEPAGE_API_URL` and `HOMEPAGE_STORAGE_DIR` when set.
    pub fn from_env(mut self) -> Self {
        if let Ok(url) = std::env::var(config::ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(dir) = std::env::var(config::ENV_STORAGE_DIR) {
            if !dir.trim().is_empty() {
                self.storage_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    /// Build the SDK. Loads the protocol registry from storage (seeding it on
    /// first run) but makes no network requests.
    pub fn build(self) -> Result<HomepageSdk> {
        if self.cache_ttl.is_zero() {
            return Err(SyncError::InvalidArgument("cache TTL must be non-zero".into()));
        }
        if self.refresh_interval.is_zero() {
            return Err(SyncError::InvalidArgument(
                "refresh interval must be non-zero".into(),
            ));
        }

        let storage: Arc<dyn Storage> = match self.storage {
            Some(storage) => storage,
            None if self.in_memory => Arc::new(MemoryStorage::new()),
            None => {
                let dir = self.storage_dir.unwrap_or_else(config::default_storage_dir);
                Arc::new(FileStorage::new(dir)?)
            }
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None if self.offline => Arc::new(OfflineTransport),
            None => Arc::new(HttpTransport::new(
                &self.base_url,
                self.timeout,
                storage.clone(),
            )?),
        };

        let homepage = Arc::new(
            HomepageDataService::new(transport.clone(), storage.clone())
                .with_cache_ttl(self.cache_ttl)
                .with_refresh_interval(self.refresh_interval),
        );
        let protocols = Arc::new(ProtocolSyncService::new(transport, storage));

        Ok(HomepageSdk {
            homepage,
            protocols,
            base_url: self.base_url,
            offline: self.offline,
        })
    }
}

// ---------------------------------------------------------------------------
// HomepageSdk
// ---------------------------------------------------------------------------

/// Owns one instance of each sync service, sharing a transport and storage.
///
/// Created via [`HomepageSdk::builder()`].
pub struct HomepageSdk {
    homepage: Arc<HomepageDataService>,
    protocols: Arc<ProtocolSyncService>,
    base_url: String,
    offline: bool,
}

impl HomepageSdk {
    pub fn builder() -> HomepageSdkBuilder {
        HomepageSdkBuilder::default()
    }

    pub fn homepage(&self) -> &Arc<HomepageDataService> {
        &self.homepage
    }

    pub fn protocols(&self) -> &Arc<ProtocolSyncService> {
        &self.protocols
    }

    /// A subscribed homepage view.
    pub fn homepage_view(&self) -> views::HomepageView {
        views::HomepageView::new(self.homepage.clone())
    }

    /// A subscribed protocol view.
    pub fn protocol_view(&self) -> views::ProtocolView {
        views::ProtocolView::new(self.protocols.clone())
    }

    /// Start live-data polling at the configured interval. Requires a Tokio
    /// runtime.
    pub fn start_auto_refresh(&self) -> bool {
        self.homepage.start_auto_refresh(None)
    }

    pub fn stop_auto_refresh(&self) {
        self.homepage.stop_auto_refresh();
    }

    /// Stop polling and release the services.
    pub fn close(self) {
        self.homepage.stop_auto_refresh();
    }
}

impl fmt::Display for HomepageSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HomepageSdk(base_url={}, offline={}, protocols={}, auto_refresh={})",
            self.base_url,
            self.offline,
            self.protocols.get_protocols().len(),
            self.homepage.is_auto_refreshing()
        )
    }
}
