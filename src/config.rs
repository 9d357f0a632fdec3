use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const API_BASE_PATH: &str = "/api/homepage";

/// Snapshot age after which `get_homepage_data` refetches.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Live-data polling period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_BASE_URL: &str = "HOMEPAGE_API_URL";
pub const ENV_STORAGE_DIR: &str = "HOMEPAGE_STORAGE_DIR";

/// Storage keys for persisted client state.
pub mod keys {
    pub const HOMEPAGE_BACKUP: &str = "homepageDataBackup";
    pub const PROTOCOLS: &str = "stakingProtocols";
    pub const PROTOCOL_STATS: &str = "protocolStats";
    pub const AUTH_TOKEN: &str = "authToken";
}

/// Endpoint paths relative to [`API_BASE_PATH`].
pub mod endpoints {
    pub const DATA: &str = "/data";
    pub const LIVE_DATA: &str = "/live-data";
    pub const OVERRIDES: &str = "/overrides";
    pub const RESET_OVERRIDES: &str = "/reset-overrides";
    pub const TESTIMONIALS: &str = "/testimonials";
    pub const REFRESH_STATS: &str = "/refresh-stats";
    pub const RESET: &str = "/reset";
    pub const IMPORT: &str = "/import";
    pub const EXPORT: &str = "/export";
    pub const AVAILABLE_PROPERTIES: &str = "/available-properties";
    pub const STATS: &str = "/stats";
}

pub fn default_storage_dir() -> PathBuf {
    if let Some(data) = dirs::data_local_dir() {
        data.join("homepage-sync")
    } else {
        PathBuf::from(".homepage-sync")
    }
}
