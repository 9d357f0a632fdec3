//! Shared fixtures for the homepage-sync integration tests.
//!
//! `MockBackend` is an in-memory stand-in for the `/api/homepage` backend. It
//! keeps a snapshot, override flags, live data and stats, counts every
//! request, and can be told to fail globally or per path.

#![allow(dead_code)]

use async_trait::async_trait;
use homepage_sync::models::{ContentSnapshot, FeaturedProperty, OverrideFlags, Section};
use homepage_sync::storage::Storage;
use homepage_sync::{HomepageDataService, MemoryStorage, Method, Result, SyncError, Transport};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct BackendState {
    snapshot: Value,
    overrides: OverrideFlags,
    live: Value,
    stats: Value,
    next_id: u64,
    omit_testimonial_ids: bool,
}

pub struct MockBackend {
    state: Mutex<BackendState>,
    calls: Mutex<HashMap<(Method, String), usize>>,
    failing: AtomicBool,
    failing_paths: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let snapshot = serde_json::to_value(backend_snapshot()).unwrap();
        Arc::new(Self {
            state: Mutex::new(BackendState {
                snapshot,
                overrides: OverrideFlags::default(),
                live: json!({
                    "marketStats": { "totalValueLocked": 150000000.0, "totalInvestors": 15000 },
                    "communityStats": { "totalMembers": 30000 },
                    "protocolStats": { "totalValueLocked": 80.5, "highestApy": 12.0, "activeProtocols": 5 }
                }),
                stats: json!({
                    "protocolStats": {
                        "totalValueLocked": 90.0,
                        "highestApy": 13.5,
                        "activeProtocols": 6,
                        "totalStakers": 90000
                    },
                    "isOverridden": false
                }),
                next_id: 100,
                omit_testimonial_ids: false,
            }),
            calls: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            failing_paths: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
        })
    }

    /// Number of requests seen for `method path`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        *self
            .calls
            .lock()
            .unwrap()
            .get(&(method, path.to_string()))
            .unwrap_or(&0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_path(&self, path: &str) {
        self.failing_paths.lock().unwrap().insert(path.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn set_live(&self, live: Value) {
        self.state.lock().unwrap().live = live;
    }

    pub fn set_stats(&self, stats: Value) {
        self.state.lock().unwrap().stats = stats;
    }

    pub fn omit_testimonial_ids(&self) {
        self.state.lock().unwrap().omit_testimonial_ids = true;
    }

    pub fn snapshot(&self) -> ContentSnapshot {
        serde_json::from_value(self.state.lock().unwrap().snapshot.clone()).unwrap()
    }

    pub fn overrides(&self) -> OverrideFlags {
        self.state.lock().unwrap().overrides
    }

    fn handle(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            (Method::Get, ["data"]) => Ok(state.snapshot.clone()),
            (Method::Put, ["data"]) => {
                state.snapshot = body.unwrap_or(Value::Null);
                Ok(state.snapshot.clone())
            }
            (Method::Put, ["data", section]) => {
                let parsed = section_from_key(section)?;
                let body = body.unwrap_or(Value::Null);
                state.snapshot[*section] = body.clone();
                state.overrides.set(parsed, true);
                Ok(body)
            }
            (Method::Get, ["live-data"]) => Ok(state.live.clone()),
            (Method::Get, ["overrides"]) => Ok(serde_json::to_value(state.overrides).unwrap()),
            (Method::Post, ["overrides", section]) => {
                let parsed = section_from_key(section)?;
                let enabled = body
                    .as_ref()
                    .and_then(|b| b.get("enabled"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                state.overrides.set(parsed, enabled);
                Ok(json!({ "section": section, "enabled": enabled }))
            }
            (Method::Post, ["reset-overrides"]) => {
                state.overrides = OverrideFlags::default();
                Ok(Value::Null)
            }
            (Method::Post, ["testimonials"]) => {
                let mut created = body.unwrap_or_else(|| json!({}));
                if !state.omit_testimonial_ids {
                    state.next_id += 1;
                    created["id"] = json!(state.next_id);
                }
                let list = state.snapshot["testimonials"].as_array_mut().unwrap();
                list.push(created.clone());
                Ok(created)
            }
            (Method::Put, ["testimonials", id]) => {
                let mut updated = body.unwrap_or_else(|| json!({}));
                updated["id"] = json!(id);
                let list = state.snapshot["testimonials"].as_array_mut().unwrap();
                match list.iter_mut().find(|t| id_matches(t, id)) {
                    Some(slot) => {
                        *slot = updated.clone();
                        Ok(updated)
                    }
                    None => Err(not_found(path)),
                }
            }
            (Method::Delete, ["testimonials", id]) => {
                let list = state.snapshot["testimonials"].as_array_mut().unwrap();
                let before = list.len();
                list.retain(|t| !id_matches(t, id));
                if list.len() == before {
                    Err(not_found(path))
                } else {
                    Ok(Value::Null)
                }
            }
            (Method::Get, ["export"]) => Ok(state.snapshot.clone()),
            (Method::Post, ["import"]) => {
                state.snapshot = body.unwrap_or(Value::Null);
                Ok(Value::Null)
            }
            (Method::Post, ["reset"]) => {
                state.snapshot = serde_json::to_value(ContentSnapshot::default()).unwrap();
                state.overrides = OverrideFlags::default();
                Ok(Value::Null)
            }
            (Method::Post, ["refresh-stats"]) => Ok(Value::Null),
            (Method::Get, ["available-properties"]) => {
                Ok(serde_json::to_value(vec![FeaturedProperty::default()]).unwrap())
            }
            (Method::Get, ["stats"]) => Ok(state.stats.clone()),
            _ => Err(not_found(path)),
        }
    }
}

#[async_trait]
impl Transport for MockBackend {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_insert(0) += 1;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) || self.failing_paths.lock().unwrap().contains(path)
        {
            return Err(SyncError::Api {
                status: 503,
                message: "backend unavailable".into(),
            });
        }
        self.handle(method, path, body)
    }
}

fn section_from_key(key: &str) -> Result<Section> {
    Section::ALL
        .into_iter()
        .find(|s| s.key() == key)
        .ok_or_else(|| SyncError::Api {
            status: 400,
            message: format!("unknown section {}", key),
        })
}

fn id_matches(testimonial: &Value, id: &str) -> bool {
    match &testimonial["id"] {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}

fn not_found(path: &str) -> SyncError {
    SyncError::Api {
        status: 404,
        message: format!("no route for {}", path),
    }
}

/// Backend content that differs from the client defaults, so tests can tell a
/// fetched snapshot from a fallback.
pub fn backend_snapshot() -> ContentSnapshot {
    let mut snapshot = ContentSnapshot::default();
    snapshot.version = 7;
    snapshot.market_stats.total_properties = 52;
    snapshot.market_stats.total_value_locked = 131_000_000.0;
    snapshot.community_stats.total_members = 26_100;
    snapshot.hero_section.title = "Fractional Real Estate for Everyone".into();
    snapshot
}

/// Storage whose writes always fail.
#[derive(Default)]
pub struct ReadOnlyStorage {
    inner: MemoryStorage,
}

impl ReadOnlyStorage {
    pub fn with(key: &str, value: &str) -> Self {
        let inner = MemoryStorage::new();
        inner.set(key, value).unwrap();
        Self { inner }
    }
}

impl Storage for ReadOnlyStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(SyncError::Storage("storage is read-only".into()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

/// A homepage service wired to a fresh mock backend and memory storage.
pub fn homepage_service() -> (Arc<HomepageDataService>, Arc<MockBackend>, Arc<MemoryStorage>) {
    let backend = MockBackend::new();
    let storage = Arc::new(MemoryStorage::new());
    let service = Arc::new(HomepageDataService::new(backend.clone(), storage.clone()));
    (service, backend, storage)
}

/// Collects every snapshot pushed to a subscriber.
pub fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
}
