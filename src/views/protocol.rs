use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::format::{format_millions, format_number, format_percent};
use super::homepage::{lock, ViewState};
use crate::models::{ProtocolRecord, ProtocolStats, ProtocolStatus, StatsReport};
use crate::services::ProtocolSyncService;
use crate::subscribers::Subscription;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRow {
    pub id: String,
    pub name: String,
    pub protocol: String,
    pub token: String,
    pub apy: String,
    pub min_stake: String,
    pub total_staked: String,
    pub category: &'static str,
    pub status: ProtocolStatus,
    pub highlighted: bool,
}

impl From<&ProtocolRecord> for ProtocolRow {
    fn from(p: &ProtocolRecord) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            protocol: p.protocol.clone(),
            token: p.token.clone(),
            apy: format_percent(p.apy),
            min_stake: format!("{} {}", p.min_stake, p.token),
            total_staked: p.total_staked.display(),
            category: p.category_label(),
            status: p.status,
            highlighted: p.highlighted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolStatsDisplay {
    pub total_value_locked: String,
    pub highest_apy: String,
    pub active_protocols: String,
    pub total_stakers: String,
}

impl From<&ProtocolStats> for ProtocolStatsDisplay {
    fn from(s: &ProtocolStats) -> Self {
        Self {
            total_value_locked: format_millions(s.total_value_locked),
            highest_apy: format_percent(s.highest_apy),
            active_protocols: format_number(u64::from(s.active_protocols)),
            total_stakers: format!("{}+", format_number(s.total_stakers)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolData {
    pub protocols: Vec<ProtocolRecord>,
    pub stats: ProtocolStats,
}

// ---------------------------------------------------------------------------
// ProtocolView
// ---------------------------------------------------------------------------

/// Subscribed view over [`ProtocolSyncService`] for the staking page and the
/// protocol admin table.
pub struct ProtocolView {
    service: Arc<ProtocolSyncService>,
    state: Arc<Mutex<ViewState<ProtocolData>>>,
    _subscription: Subscription,
}

impl ProtocolView {
    pub fn new(service: Arc<ProtocolSyncService>) -> Self {
        let state = Arc::new(Mutex::new(ViewState::new(ProtocolData {
            protocols: service.get_protocols(),
            stats: service.get_stats(),
        })));
        let sink = state.clone();
        let subscription = service.subscribe(move |protocols, stats| {
            lock(&sink).data = ProtocolData {
                protocols: protocols.to_vec(),
                stats: stats.clone(),
            };
        });
        Self {
            service,
            state,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> ViewState<ProtocolData> {
        lock(&self.state).clone()
    }

    /// Rows for enabled protocols, highlighted first, in registry order
    /// otherwise.
    pub fn display_rows(&self) -> Vec<ProtocolRow> {
        let state = lock(&self.state);
        let mut rows: Vec<ProtocolRow> = state
            .data
            .protocols
            .iter()
            .filter(|p| p.enabled)
            .map(ProtocolRow::from)
            .collect();
        rows.sort_by_key(|r| !r.highlighted);
        rows
    }

    pub fn stats_display(&self) -> ProtocolStatsDisplay {
        ProtocolStatsDisplay::from(&lock(&self.state).data.stats)
    }

    pub fn update_apy(&self, id: &str, apy: f64) -> bool {
        let ok = self.service.update_protocol_apy(id, apy);
        self.record(ok, "Failed to update APY")
    }

    pub fn toggle_enabled(&self, id: &str) -> bool {
        let ok = self.service.toggle_protocol_enabled(id);
        self.record(ok, "Failed to toggle protocol")
    }

    pub fn toggle_highlighted(&self, id: &str) -> bool {
        let ok = self.service.toggle_protocol_highlighted(id);
        self.record(ok, "Failed to toggle highlight")
    }

    fn record(&self, ok: bool, message: &str) -> bool {
        lock(&self.state).error = if ok { None } else { Some(message.to_string()) };
        ok
    }
}

// ---------------------------------------------------------------------------
// ProtocolStatsView
// ---------------------------------------------------------------------------

/// Read-only protocol aggregates for the homepage stats strip.
pub struct ProtocolStatsView {
    service: Arc<ProtocolSyncService>,
    state: Arc<Mutex<ViewState<StatsReport>>>,
    _subscription: Subscription,
}

impl ProtocolStatsView {
    pub fn new(service: Arc<ProtocolSyncService>) -> Self {
        let state = Arc::new(Mutex::new(ViewState::new(StatsReport {
            stats: service.get_stats(),
            is_live_data: false,
        })));
        let sink = state.clone();
        let subscription = service.subscribe(move |_, stats| {
            lock(&sink).data = StatsReport {
                stats: stats.clone(),
                is_live_data: false,
            };
        });
        Self {
            service,
            state,
            _subscription: subscription,
        }
    }

    pub fn report(&self) -> StatsReport {
        lock(&self.state).data.clone()
    }

    pub fn display(&self) -> ProtocolStatsDisplay {
        ProtocolStatsDisplay::from(&lock(&self.state).data.stats)
    }

    /// Prefer backend stats; the service falls back to local ones.
    pub async fn load_live(&self) -> StatsReport {
        lock(&self.state).loading = true;
        let report = self.service.get_stats_async().await;
        let mut state = lock(&self.state);
        state.data = report.clone();
        state.loading = false;
        report
    }
}
