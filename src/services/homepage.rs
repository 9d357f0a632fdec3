//! Synchronized homepage content cache.
//!
//! [`HomepageDataService`] owns the session's copy of homepage content. Reads
//! are served from memory while the snapshot is younger than the TTL; misses
//! go to the backend with a single in-flight fetch shared by concurrent
//! callers. Admin edits pin a section with an override flag so the live-data
//! poller leaves it alone until the override is reset.
//!
//! Public methods never return errors: reads degrade to the stored backup or
//! defaults, writes report `false`/`None`, and the failure is logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{self, endpoints, keys};
use crate::error::{Result, SyncError};
use crate::models::{
    CommunityStats, ContentSnapshot, FeaturedProperty, LiveData, MarketStats, NewTestimonial,
    OverrideFlags, PlatformConfig, Section, Testimonial,
};
use crate::storage::{self, Storage};
use crate::subscribers::{Subscribers, Subscription};
use crate::transport::{Method, Transport};

/// Listener invoked with the latest snapshot.
pub type SnapshotListener = dyn Fn(&ContentSnapshot) + Send + Sync;

/// Outcome of an override change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSync {
    /// Backend accepted the change.
    Synced,
    /// Backend call failed; the flag was changed in this session only.
    LocalOnly,
}

struct CacheState {
    snapshot: ContentSnapshot,
    fetched_at: Option<Instant>,
    overrides: OverrideFlags,
    last_error: Option<String>,
    /// Bumped by every local write and invalidation.
    epoch: u64,
}

impl CacheState {
    fn mark_dirty(&mut self) {
        self.fetched_at = None;
        self.epoch += 1;
    }
}

pub struct HomepageDataService {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    cache_ttl: Duration,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
    fetch_gate: tokio::sync::Mutex<()>,
    fetch_generation: AtomicU64,
    subscribers: Subscribers<SnapshotListener>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl HomepageDataService {
    /// Create a service starting from the default snapshot with no overrides.
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn Storage>) -> Self {
        Self {
            transport,
            storage,
            cache_ttl: config::DEFAULT_CACHE_TTL,
            refresh_interval: config::DEFAULT_REFRESH_INTERVAL,
            state: RwLock::new(CacheState {
                snapshot: ContentSnapshot::default(),
                fetched_at: None,
                overrides: OverrideFlags::default(),
                last_error: None,
                epoch: 0,
            }),
            fetch_gate: tokio::sync::Mutex::new(()),
            fetch_generation: AtomicU64::new(0),
            subscribers: Subscribers::new(),
            refresh_task: Mutex::new(None),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    // -- Reads -------------------------------------------------------------

    /// Return the current snapshot, fetching from the backend when the cache
    /// is empty or older than the TTL.
    ///
    /// Concurrent callers share one in-flight fetch. On failure the stored
    /// backup (or the in-memory snapshot) is returned and subscribers are
    /// notified with it.
    pub async fn get_homepage_data(&self) -> ContentSnapshot {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }

        let generation = self.fetch_generation.load(Ordering::Acquire);
        let _gate = self.fetch_gate.lock().await;

        // A fetch finished while we waited; take its result.
        if self.fetch_generation.load(Ordering::Acquire) != generation {
            return self.cached();
        }
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }

        let epoch = self.read_state().epoch;
        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => {
                let applied = {
                    let mut state = self.write_state();
                    state.last_error = None;
                    if state.epoch == epoch {
                        state.snapshot = snapshot.clone();
                        state.fetched_at = Some(Instant::now());
                        None
                    } else {
                        Some(state.snapshot.clone())
                    }
                };
                match applied {
                    None => {
                        self.save_backup(&snapshot);
                        debug!(version = snapshot.version, "homepage data fetched");
                        snapshot
                    }
                    // A local write landed mid-fetch; the response predates it.
                    Some(current) => {
                        debug!("discarding fetch that raced a local write");
                        current
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch homepage data, using fallback");
                let backup = self.load_backup();
                let mut state = self.write_state();
                if let Some(backup) = backup {
                    state.snapshot = backup;
                }
                state.last_error = Some(e.to_string());
                state.snapshot.clone()
            }
        };

        self.fetch_generation.fetch_add(1, Ordering::AcqRel);
        self.notify(&snapshot);
        snapshot
    }

    /// The cached snapshot, without any I/O.
    pub fn cached(&self) -> ContentSnapshot {
        self.read_state().snapshot.clone()
    }

    fn fresh_snapshot(&self) -> Option<ContentSnapshot> {
        let state = self.read_state();
        match state.fetched_at {
            Some(at) if at.elapsed() < self.cache_ttl => Some(state.snapshot.clone()),
            _ => None,
        }
    }

    /// Whether the next read will hit the backend.
    pub fn is_stale(&self) -> bool {
        self.fresh_snapshot().is_none()
    }

    /// Force the next read to refetch. The cached snapshot stays available
    /// through [`cached`](Self::cached) in the meantime.
    pub fn invalidate(&self) {
        self.write_state().mark_dirty();
    }

    /// Message of the most recent failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.read_state().last_error.clone()
    }

    async fn fetch_snapshot(&self) -> Result<ContentSnapshot> {
        let data = self
            .transport
            .request(Method::Get, endpoints::DATA, None)
            .await?;
        if data.is_null() {
            return Err(SyncError::NotFound("homepage data missing from response".into()));
        }
        Ok(serde_json::from_value(data)?)
    }

    fn load_backup(&self) -> Option<ContentSnapshot> {
        match storage::load_json(self.storage.as_ref(), keys::HOMEPAGE_BACKUP) {
            Ok(backup) => backup,
            Err(e) => {
                warn!(error = %e, "homepage backup unreadable");
                None
            }
        }
    }

    fn save_backup(&self, snapshot: &ContentSnapshot) {
        if let Err(e) = storage::save_json(self.storage.as_ref(), keys::HOMEPAGE_BACKUP, snapshot) {
            warn!(error = %e, "failed to store homepage backup");
        }
    }

    // -- Section updates ---------------------------------------------------

    pub async fn update_market_stats(&self, stats: MarketStats) -> bool {
        self.update_section(Section::MarketStats, &stats, |s| s.market_stats = stats.clone())
            .await
    }

    pub async fn update_community_stats(&self, stats: CommunityStats) -> bool {
        self.update_section(Section::CommunityStats, &stats, |s| {
            s.community_stats = stats.clone()
        })
        .await
    }

    pub async fn update_featured_property(&self, property: FeaturedProperty) -> bool {
        self.update_section(Section::FeaturedProperty, &property, |s| {
            s.featured_property = property.clone()
        })
        .await
    }

    pub async fn update_testimonials(&self, testimonials: Vec<Testimonial>) -> bool {
        if let Some(e) = testimonials
            .iter()
            .find_map(|t| validate_rating(t.rating).err())
        {
            error!(error = %e, "testimonials rejected");
            return false;
        }
        self.update_section(Section::Testimonials, &testimonials, |s| {
            s.testimonials = testimonials.clone()
        })
        .await
    }

    pub async fn update_platform_settings(&self, settings: PlatformConfig) -> bool {
        self.update_section(Section::Config, &settings, |s| s.config = settings.clone())
            .await
    }

    /// PUT one section. Only after the backend accepts it is the cached section
    /// replaced and its override flag set.
    async fn update_section<T, F>(&self, section: Section, payload: &T, apply: F) -> bool
    where
        T: Serialize,
        F: FnOnce(&mut ContentSnapshot),
    {
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => {
                error!(%section, error = %e, "failed to encode section payload");
                return false;
            }
        };
        let path = format!("{}/{}", endpoints::DATA, section.key());
        if let Err(e) = self.transport.request(Method::Put, &path, Some(body)).await {
            error!(%section, error = %e, "section update rejected");
            return false;
        }

        let snapshot = {
            let mut state = self.write_state();
            apply(&mut state.snapshot);
            state.snapshot.last_updated = Some(Utc::now());
            state.overrides.set(section, true);
            state.mark_dirty();
            state.snapshot.clone()
        };
        info!(%section, "section updated, override set");
        self.save_backup(&snapshot);
        self.notify(&snapshot);
        true
    }

    /// Replace the whole backend snapshot.
    pub async fn replace_all(&self, snapshot: ContentSnapshot) -> bool {
        let body = match serde_json::to_value(&snapshot) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to encode snapshot");
                return false;
            }
        };
        if let Err(e) = self
            .transport
            .request(Method::Put, endpoints::DATA, Some(body))
            .await
        {
            error!(error = %e, "bulk replace rejected");
            return false;
        }
        {
            let mut state = self.write_state();
            state.snapshot = snapshot.clone();
            state.mark_dirty();
        }
        self.save_backup(&snapshot);
        self.notify(&snapshot);
        true
    }

    // -- Testimonials ------------------------------------------------------

    /// Create a testimonial. The id comes from the backend, or from the
    /// current Unix time in milliseconds when the backend omits one.
    pub async fn add_testimonial(&self, testimonial: NewTestimonial) -> Option<Testimonial> {
        if let Err(e) = validate_rating(testimonial.rating) {
            error!(error = %e, "testimonial rejected");
            return None;
        }
        let body = serde_json::to_value(&testimonial).ok()?;
        let data = match self
            .transport
            .request(Method::Post, endpoints::TESTIMONIALS, Some(body))
            .await
        {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "failed to add testimonial");
                return None;
            }
        };

        let created = serde_json::from_value::<Testimonial>(data)
            .ok()
            .filter(|t| !t.id.is_empty())
            .unwrap_or_else(|| {
                testimonial
                    .clone()
                    .with_id(Utc::now().timestamp_millis().to_string())
            });

        let snapshot = {
            let mut state = self.write_state();
            state.snapshot.testimonials.push(created.clone());
            state.mark_dirty();
            state.snapshot.clone()
        };
        debug!(id = %created.id, "testimonial added");
        self.notify(&snapshot);
        Some(created)
    }

    pub async fn update_testimonial(
        &self,
        id: &str,
        testimonial: NewTestimonial,
    ) -> Option<Testimonial> {
        if let Err(e) = validate_rating(testimonial.rating) {
            error!(id, error = %e, "testimonial rejected");
            return None;
        }
        let body = serde_json::to_value(&testimonial).ok()?;
        let path = format!("{}/{}", endpoints::TESTIMONIALS, id);
        if let Err(e) = self.transport.request(Method::Put, &path, Some(body)).await {
            error!(id, error = %e, "failed to update testimonial");
            return None;
        }

        let updated = testimonial.with_id(id.to_string());
        let snapshot = {
            let mut state = self.write_state();
            if let Some(slot) = state.snapshot.testimonials.iter_mut().find(|t| t.id == id) {
                *slot = updated.clone();
            }
            state.mark_dirty();
            state.snapshot.clone()
        };
        self.notify(&snapshot);
        Some(updated)
    }

    pub async fn remove_testimonial(&self, id: &str) -> bool {
        let path = format!("{}/{}", endpoints::TESTIMONIALS, id);
        if let Err(e) = self.transport.request(Method::Delete, &path, None).await {
            error!(id, error = %e, "failed to remove testimonial");
            return false;
        }
        let snapshot = {
            let mut state = self.write_state();
            state.snapshot.testimonials.retain(|t| t.id != id);
            state.mark_dirty();
            state.snapshot.clone()
        };
        debug!(id, "testimonial removed");
        self.notify(&snapshot);
        true
    }

    // -- Live data ---------------------------------------------------------

    /// Poll `/live-data` and merge it into the cache.
    ///
    /// Market and community stats are merged only while their override flag
    /// is clear; protocol stats are always merged.
    pub async fn fetch_live_data(&self) -> bool {
        match self.try_fetch_live_data().await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "failed to fetch live data");
                false
            }
        }
    }

    async fn try_fetch_live_data(&self) -> Result<ContentSnapshot> {
        let data = self
            .transport
            .request(Method::Get, endpoints::LIVE_DATA, None)
            .await?;
        let live: LiveData = if data.is_null() {
            LiveData::default()
        } else {
            serde_json::from_value(data)?
        };

        let snapshot = {
            let mut state = self.write_state();
            let overrides = state.overrides;

            if let Some(patch) = live.market_stats {
                if overrides.market_stats {
                    debug!("market stats overridden, skipping live merge");
                } else {
                    merge_fields(&mut state.snapshot.market_stats, patch, "marketStats");
                }
            }
            if let Some(patch) = live.community_stats {
                if overrides.community_stats {
                    debug!("community stats overridden, skipping live merge");
                } else {
                    merge_fields(&mut state.snapshot.community_stats, patch, "communityStats");
                }
            }
            if let Some(patch) = live.protocol_stats {
                merge_fields(&mut state.snapshot.protocol_stats, patch, "protocolStats");
            }
            state.snapshot.clone()
        };

        self.save_backup(&snapshot);
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Start polling live data every `interval` (the configured refresh
    /// interval when `None`). Replaces any running poller.
    ///
    /// Must be called from within a Tokio runtime; returns `false` otherwise.
    /// The poller holds only a weak reference and stops once the service is
    /// dropped.
    pub fn start_auto_refresh(self: &Arc<Self>, interval: Option<Duration>) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("auto-refresh requires a Tokio runtime");
            return false;
        }
        let period = interval.unwrap_or(self.refresh_interval);
        if period.is_zero() {
            warn!("auto-refresh interval must be non-zero");
            return false;
        }

        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = service.try_fetch_live_data().await {
                    warn!(error = %e, "auto-refresh failed, retrying next tick");
                }
            }
        });

        let mut task = self.refresh_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
        info!(interval_ms = period.as_millis() as u64, "auto-refresh started");
        true
    }

    pub fn stop_auto_refresh(&self) {
        let mut task = self.refresh_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
            info!("auto-refresh stopped");
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        let task = self.refresh_task.lock().unwrap_or_else(|e| e.into_inner());
        task.as_ref().is_some_and(|h| !h.is_finished())
    }

    // -- Overrides ---------------------------------------------------------

    pub fn overrides(&self) -> OverrideFlags {
        self.read_state().overrides
    }

    /// Pull override flags from the backend. Local flags are kept if the
    /// backend is unreachable.
    pub async fn sync_overrides(&self) -> OverrideFlags {
        let fetched = self
            .transport
            .request(Method::Get, endpoints::OVERRIDES, None)
            .await
            .and_then(|data| Ok(serde_json::from_value::<OverrideFlags>(data)?));
        match fetched {
            Ok(flags) => {
                self.write_state().overrides = flags;
                flags
            }
            Err(e) => {
                warn!(error = %e, "failed to load overrides, keeping local flags");
                self.overrides()
            }
        }
    }

    /// Set or clear one section's override.
    ///
    /// The flag always changes locally; [`OverrideSync::LocalOnly`] reports
    /// that the backend did not record it.
    pub async fn set_override(&self, section: Section, enabled: bool) -> OverrideSync {
        let path = format!("{}/{}", endpoints::OVERRIDES, section.key());
        let result = self
            .transport
            .request(Method::Post, &path, Some(json!({ "enabled": enabled })))
            .await;

        self.write_state().overrides.set(section, enabled);
        match result {
            Ok(_) => {
                debug!(%section, enabled, "override synced");
                OverrideSync::Synced
            }
            Err(e) => {
                warn!(%section, enabled, error = %e, "override changed locally only");
                OverrideSync::LocalOnly
            }
        }
    }

    /// Clear every override so all sections follow live data again.
    pub async fn reset_all_overrides(&self) -> OverrideSync {
        let result = self
            .transport
            .request(Method::Post, endpoints::RESET_OVERRIDES, None)
            .await;

        self.write_state().overrides = OverrideFlags::default();
        match result {
            Ok(_) => {
                info!("all overrides reset");
                OverrideSync::Synced
            }
            Err(e) => {
                warn!(error = %e, "overrides reset locally only");
                OverrideSync::LocalOnly
            }
        }
    }

    // -- Bulk operations ---------------------------------------------------

    pub async fn export_data(&self) -> Option<Value> {
        match self
            .transport
            .request(Method::Get, endpoints::EXPORT, None)
            .await
        {
            Ok(data) if !data.is_null() => Some(data),
            Ok(_) => {
                error!("export returned no data");
                None
            }
            Err(e) => {
                error!(error = %e, "failed to export homepage data");
                None
            }
        }
    }

    pub async fn import_data(&self, data: Value) -> bool {
        if !data.is_object() {
            error!("import payload must be a JSON object");
            return false;
        }
        match self
            .transport
            .request(Method::Post, endpoints::IMPORT, Some(data))
            .await
        {
            Ok(_) => {
                self.invalidate();
                info!("homepage data imported");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to import homepage data");
                false
            }
        }
    }

    /// Reset backend content to its defaults and drop the local backup.
    pub async fn clear_data(&self) -> bool {
        match self
            .transport
            .request(Method::Post, endpoints::RESET, None)
            .await
        {
            Ok(_) => {
                self.invalidate();
                if let Err(e) = self.storage.remove(keys::HOMEPAGE_BACKUP) {
                    warn!(error = %e, "failed to remove homepage backup");
                }
                info!("homepage data cleared");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to clear homepage data");
                false
            }
        }
    }

    /// Ask the backend to recompute its live stats.
    pub async fn refresh_stats(&self) -> bool {
        match self
            .transport
            .request(Method::Post, endpoints::REFRESH_STATS, None)
            .await
        {
            Ok(_) => {
                self.invalidate();
                true
            }
            Err(e) => {
                error!(error = %e, "failed to refresh stats");
                false
            }
        }
    }

    /// Properties that can be chosen as the featured property.
    pub async fn available_properties(&self) -> Vec<FeaturedProperty> {
        let fetched = self
            .transport
            .request(Method::Get, endpoints::AVAILABLE_PROPERTIES, None)
            .await
            .and_then(|data| Ok(serde_json::from_value::<Vec<FeaturedProperty>>(data)?));
        fetched.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load available properties");
            Vec::new()
        })
    }

    pub async fn backend_stats(&self) -> Option<Value> {
        match self
            .transport
            .request(Method::Get, endpoints::STATS, None)
            .await
        {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(error = %e, "failed to load backend stats");
                None
            }
        }
    }

    // -- Subscribers -------------------------------------------------------

    /// Register a listener called with the full snapshot after every fetch or
    /// successful mutation.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ContentSnapshot) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(Arc::new(listener))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&self, snapshot: &ContentSnapshot) {
        self.subscribers.notify(|listener| listener(snapshot));
    }
}

impl Drop for HomepageDataService {
    fn drop(&mut self) {
        if let Ok(mut task) = self.refresh_task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

fn validate_rating(rating: u8) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(SyncError::InvalidArgument(format!(
            "rating must be between 1 and 5, got {}",
            rating
        )))
    }
}

/// Overlay the keys of `patch` onto `target`'s JSON form.
///
/// Leaves `target` unchanged if the merged object no longer deserializes.
fn merge_fields<T>(target: &mut T, patch: Value, section: &str)
where
    T: Serialize + DeserializeOwned,
{
    let Value::Object(fields) = patch else {
        warn!(section, "live payload is not an object, ignoring");
        return;
    };
    let mut current = match serde_json::to_value(&*target) {
        Ok(Value::Object(map)) => map,
        _ => return,
    };
    for (key, value) in fields {
        current.insert(key, value);
    }
    match serde_json::from_value(Value::Object(current)) {
        Ok(merged) => *target = merged,
        Err(e) => warn!(section, error = %e, "live payload has invalid fields, ignoring"),
    }
}
