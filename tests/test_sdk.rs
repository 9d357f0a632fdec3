mod common;

use common::{backend_snapshot, MockBackend};
use homepage_sync::config::{self, keys};
use homepage_sync::{HomepageSdk, Storage, SyncError};
use std::time::Duration;

#[test]
fn offline_sdk_runs_on_defaults() {
    let sdk = HomepageSdk::builder()
        .offline(true)
        .in_memory(true)
        .build()
        .unwrap();

    assert_eq!(sdk.protocols().get_protocols().len(), 4);
    assert_eq!(sdk.homepage().cached().version, 1);
    assert_eq!(sdk.homepage().cache_ttl(), config::DEFAULT_CACHE_TTL);
    assert_eq!(sdk.homepage().refresh_interval(), config::DEFAULT_REFRESH_INTERVAL);
}

#[tokio::test]
async fn custom_transport_is_shared_by_both_services() {
    let backend = MockBackend::new();
    let sdk = HomepageSdk::builder()
        .in_memory(true)
        .transport(backend.clone())
        .cache_ttl(Duration::from_secs(60))
        .build()
        .unwrap();

    assert_eq!(sdk.homepage().get_homepage_data().await, backend_snapshot());
    assert!(sdk.protocols().get_stats_async().await.is_live_data);
    assert_eq!(backend.total_calls(), 2);
    assert_eq!(sdk.homepage().cache_ttl(), Duration::from_secs(60));
}

#[test]
fn zero_durations_are_rejected() {
    let err = HomepageSdk::builder()
        .offline(true)
        .in_memory(true)
        .cache_ttl(Duration::ZERO)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, SyncError::InvalidArgument(_)));

    let err = HomepageSdk::builder()
        .offline(true)
        .in_memory(true)
        .refresh_interval(Duration::ZERO)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, SyncError::InvalidArgument(_)));
}

#[test]
fn storage_dir_persists_protocols() {
    let tmp_dir = tempfile::tempdir().unwrap();
    {
        let sdk = HomepageSdk::builder()
            .offline(true)
            .storage_dir(tmp_dir.path())
            .build()
            .unwrap();
        assert!(sdk.protocols().update_protocol_apy("curve-tricrypto", 10.4));
    }
    assert!(tmp_dir.path().join(format!("{}.json", keys::PROTOCOLS)).exists());

    let sdk = HomepageSdk::builder()
        .offline(true)
        .storage_dir(tmp_dir.path())
        .build()
        .unwrap();
    assert_eq!(sdk.protocols().get_protocol("curve-tricrypto").unwrap().apy, 10.4);
}

#[test]
fn from_env_reads_url_and_storage_dir() {
    let tmp_dir = tempfile::tempdir().unwrap();
    std::env::set_var(config::ENV_BASE_URL, "https://homepage.test");
    std::env::set_var(config::ENV_STORAGE_DIR, tmp_dir.path());

    let sdk = HomepageSdk::builder().from_env().offline(true).build().unwrap();
    std::env::remove_var(config::ENV_BASE_URL);
    std::env::remove_var(config::ENV_STORAGE_DIR);

    assert!(sdk.to_string().contains("base_url=https://homepage.test"));
    assert!(tmp_dir.path().join(format!("{}.json", keys::PROTOCOLS)).exists());
}

#[test]
fn display_summarizes_configuration() {
    let sdk = HomepageSdk::builder()
        .base_url("https://api.example.com")
        .offline(true)
        .in_memory(true)
        .build()
        .unwrap();
    assert_eq!(
        sdk.to_string(),
        "HomepageSdk(base_url=https://api.example.com, offline=true, protocols=4, auto_refresh=false)"
    );
}

#[test]
fn custom_storage_receives_state() {
    let storage = std::sync::Arc::new(homepage_sync::MemoryStorage::new());
    let _sdk = HomepageSdk::builder()
        .offline(true)
        .storage(storage.clone())
        .build()
        .unwrap();
    assert!(storage.get(keys::PROTOCOLS).unwrap().is_some());
    assert!(storage.get(keys::PROTOCOL_STATS).unwrap().is_some());
}

#[tokio::test]
async fn auto_refresh_lifecycle() {
    let sdk = HomepageSdk::builder()
        .in_memory(true)
        .transport(MockBackend::new())
        .build()
        .unwrap();

    assert!(sdk.start_auto_refresh());
    assert!(sdk.homepage().is_auto_refreshing());
    assert!(sdk.to_string().ends_with("auto_refresh=true)"));

    sdk.stop_auto_refresh();
    assert!(!sdk.homepage().is_auto_refreshing());

    assert!(sdk.start_auto_refresh());
    let homepage = sdk.homepage().clone();
    sdk.close();
    assert!(!homepage.is_auto_refreshing());
}

#[test]
fn views_subscribe_to_their_services() {
    let sdk = HomepageSdk::builder()
        .offline(true)
        .in_memory(true)
        .build()
        .unwrap();

    let homepage_view = sdk.homepage_view();
    let protocol_view = sdk.protocol_view();
    assert_eq!(sdk.homepage().subscriber_count(), 1);
    assert_eq!(sdk.protocols().subscriber_count(), 1);
    assert_eq!(protocol_view.display_rows().len(), 4);
    assert_eq!(homepage_view.data().version, 1);
}
