//! Client-side staking protocol registry.
//!
//! Protocol records live only in local storage; the backend contributes at
//! most an authoritative copy of the aggregate stats. Stats are recomputed
//! from the full record list after every mutation.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{endpoints, keys};
use crate::error::{Result, SyncError};
use crate::models::{
    check_quantity, default_protocols, slugify, AdminProtocol, Amount, ProtocolPatch,
    ProtocolRecord, ProtocolStats, Risk, StatsReport,
};
use crate::storage::{self, Storage};
use crate::subscribers::{Subscribers, Subscription};
use crate::transport::{Method, Transport};

/// Listener invoked with the full protocol list and fresh stats.
pub type ProtocolListener = dyn Fn(&[ProtocolRecord], &ProtocolStats) + Send + Sync;

/// Placeholder stake sizing for admin imports, cycled by list position.
const IMPORT_MIN_STAKES: [f64; 4] = [0.01, 100.0, 50.0, 250.0];
const IMPORT_TOTAL_STAKED_MILLIONS: [f64; 4] = [32.5, 18.2, 12.7, 8.4];

struct RegistryState {
    protocols: Vec<ProtocolRecord>,
    stats: ProtocolStats,
}

pub struct ProtocolSyncService {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    state: RwLock<RegistryState>,
    subscribers: Subscribers<ProtocolListener>,
}

impl ProtocolSyncService {
    /// Load the registry from storage, seeding defaults when it is missing,
    /// empty, or unreadable.
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn Storage>) -> Self {
        let protocols = match storage::load_json::<Vec<ProtocolRecord>>(
            storage.as_ref(),
            keys::PROTOCOLS,
        ) {
            Ok(Some(list)) if !list.is_empty() => list,
            Ok(_) => seed_defaults(storage.as_ref()),
            Err(e) => {
                warn!(error = %e, "stored protocols unreadable, reseeding defaults");
                seed_defaults(storage.as_ref())
            }
        };
        let stats = ProtocolStats::compute(&protocols);
        persist_stats(storage.as_ref(), &stats);

        Self {
            transport,
            storage,
            state: RwLock::new(RegistryState { protocols, stats }),
            subscribers: Subscribers::new(),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    // -- Reads -------------------------------------------------------------

    pub fn get_protocols(&self) -> Vec<ProtocolRecord> {
        self.read_state().protocols.clone()
    }

    /// Enabled protocols, in registry order.
    pub fn get_enabled_protocols(&self) -> Vec<ProtocolRecord> {
        self.read_state()
            .protocols
            .iter()
            .filter(|p| p.enabled)
            .cloned()
            .collect()
    }

    pub fn get_protocols_by_category(&self, risk: Risk) -> Vec<ProtocolRecord> {
        self.read_state()
            .protocols
            .iter()
            .filter(|p| p.risk == risk)
            .cloned()
            .collect()
    }

    pub fn get_protocol(&self, id: &str) -> Option<ProtocolRecord> {
        self.read_state()
            .protocols
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn get_stats(&self) -> ProtocolStats {
        self.read_state().stats.clone()
    }

    // -- Mutations ---------------------------------------------------------

    /// Apply `patch` to the protocol with `id`.
    ///
    /// Returns `false` when the id is unknown or the registry cannot be
    /// persisted; in both cases nothing changes.
    pub fn update_protocol(&self, id: &str, patch: ProtocolPatch) -> bool {
        if let Err(e) = patch.validate() {
            warn!(id, error = %e, "rejected protocol update");
            return false;
        }
        self.mutate(id, |record| record.apply(&patch))
    }

    pub fn update_protocol_apy(&self, id: &str, apy: f64) -> bool {
        self.update_protocol(
            id,
            ProtocolPatch {
                apy: Some(apy),
                ..Default::default()
            },
        )
    }

    pub fn toggle_protocol_enabled(&self, id: &str) -> bool {
        self.mutate(id, |record| record.enabled = !record.enabled)
    }

    pub fn toggle_protocol_highlighted(&self, id: &str) -> bool {
        self.mutate(id, |record| record.highlighted = !record.highlighted)
    }

    fn mutate<F>(&self, id: &str, change: F) -> bool
    where
        F: FnOnce(&mut ProtocolRecord),
    {
        let (protocols, stats) = {
            let mut state = self.write_state();
            let Some(index) = state.protocols.iter().position(|p| p.id == id) else {
                let e = SyncError::NotFound(format!("protocol {}", id));
                warn!(id, error = %e, "update skipped");
                return false;
            };

            let mut next = state.protocols.clone();
            change(&mut next[index]);
            next[index].last_updated = Utc::now();

            match self.commit(&mut state, next) {
                Ok(stats) => (state.protocols.clone(), stats),
                Err(e) => {
                    error!(id, error = %e, "failed to persist protocol update");
                    return false;
                }
            }
        };
        debug!(id, "protocol updated");
        self.notify(&protocols, &stats);
        true
    }

    /// Persist `next`, then swap it in with freshly computed stats.
    fn commit(
        &self,
        state: &mut RegistryState,
        next: Vec<ProtocolRecord>,
    ) -> Result<ProtocolStats> {
        storage::save_json(self.storage.as_ref(), keys::PROTOCOLS, &next)?;
        let stats = ProtocolStats::compute(&next);
        persist_stats(self.storage.as_ref(), &stats);
        state.protocols = next;
        state.stats = stats.clone();
        Ok(stats)
    }

    /// Recompute stats from the current records.
    pub fn update_stats(&self) -> ProtocolStats {
        let mut state = self.write_state();
        let stats = ProtocolStats::compute(&state.protocols);
        persist_stats(self.storage.as_ref(), &stats);
        state.stats = stats.clone();
        stats
    }

    /// Replace the registry with protocols edited in the admin panel.
    ///
    /// Ids are slugs of the names (suffixed on collision). `min_stake` and
    /// `total_staked` are placeholder values chosen by list position, not
    /// real market data.
    pub fn import_from_admin(&self, entries: Vec<AdminProtocol>) -> bool {
        if entries.is_empty() {
            warn!("refusing to import an empty protocol list");
            return false;
        }
        if let Some(e) = entries.iter().find_map(|e| check_quantity("apy", e.apy).err()) {
            warn!(error = %e, "refusing to import protocol list");
            return false;
        }

        let now = Utc::now();
        let mut seen = HashSet::new();
        let next: Vec<ProtocolRecord> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let base = slugify(&entry.name);
                let base = if base.is_empty() {
                    format!("protocol-{}", index + 1)
                } else {
                    base
                };
                let mut id = base.clone();
                let mut n = 2;
                while !seen.insert(id.clone()) {
                    id = format!("{}-{}", base, n);
                    n += 1;
                }
                let tier = index % IMPORT_MIN_STAKES.len();
                ProtocolRecord {
                    id,
                    name: entry.name,
                    protocol: entry.protocol,
                    token: entry.token,
                    apy: entry.apy,
                    min_stake: IMPORT_MIN_STAKES[tier],
                    total_staked: Amount::usd_millions(IMPORT_TOTAL_STAKED_MILLIONS[tier]),
                    risk: entry.risk,
                    status: entry.status,
                    enabled: entry.enabled,
                    highlighted: entry.highlighted,
                    last_updated: now,
                }
            })
            .collect();

        self.replace(next, "import")
    }

    /// Discard all edits and reseed the default protocols.
    pub fn reset_to_defaults(&self) -> bool {
        self.replace(default_protocols(Utc::now()), "reset")
    }

    fn replace(&self, next: Vec<ProtocolRecord>, reason: &str) -> bool {
        let count = next.len();
        let (protocols, stats) = {
            let mut state = self.write_state();
            match self.commit(&mut state, next) {
                Ok(stats) => (state.protocols.clone(), stats),
                Err(e) => {
                    error!(reason, error = %e, "failed to persist protocol registry");
                    return false;
                }
            }
        };
        info!(reason, count, "protocol registry replaced");
        self.notify(&protocols, &stats);
        true
    }

    // -- Backend stats -----------------------------------------------------

    /// Fetch aggregate stats from the backend, falling back to the local
    /// computation.
    ///
    /// `is_live_data` is `false` when the backend reports its protocol stats
    /// as manually overridden, and always `false` for the local fallback.
    pub async fn get_stats_async(&self) -> StatsReport {
        match self.fetch_remote_stats().await {
            Ok((stats, overridden)) => {
                persist_stats(self.storage.as_ref(), &stats);
                self.write_state().stats = stats.clone();
                StatsReport {
                    stats,
                    is_live_data: !overridden,
                }
            }
            Err(e) => {
                warn!(error = %e, "backend stats unavailable, using local computation");
                StatsReport {
                    stats: self.update_stats(),
                    is_live_data: false,
                }
            }
        }
    }

    async fn fetch_remote_stats(&self) -> Result<(ProtocolStats, bool)> {
        let data = self
            .transport
            .request(Method::Get, endpoints::STATS, None)
            .await?;
        let overridden = data
            .get("isOverridden")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let raw = match data.get("protocolStats") {
            Some(inner) => inner.clone(),
            None => data,
        };
        if !raw.is_object() {
            return Err(SyncError::NotFound("protocol stats missing from response".into()));
        }
        Ok((serde_json::from_value(raw)?, overridden))
    }

    // -- Subscribers -------------------------------------------------------

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[ProtocolRecord], &ProtocolStats) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(Arc::new(listener))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&self, protocols: &[ProtocolRecord], stats: &ProtocolStats) {
        self.subscribers.notify(|listener| listener(protocols, stats));
    }
}

fn seed_defaults(storage: &dyn Storage) -> Vec<ProtocolRecord> {
    let protocols = default_protocols(Utc::now());
    match storage::save_json(storage, keys::PROTOCOLS, &protocols) {
        Ok(()) => info!(count = protocols.len(), "seeded default protocols"),
        Err(e) => warn!(error = %e, "failed to persist default protocols"),
    }
    protocols
}

fn persist_stats(storage: &dyn Storage, stats: &ProtocolStats) {
    if let Err(e) = storage::save_json(storage, keys::PROTOCOL_STATS, stats) {
        warn!(error = %e, "failed to persist protocol stats");
    }
}
