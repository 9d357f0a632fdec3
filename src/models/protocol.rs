use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::amount::Amount;
use crate::error::{Result, SyncError};

// ---------------------------------------------------------------------------
// Risk — Risk tier (doubles as listing category)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl Risk {
    /// Category label shown on listing filters, e.g. `Low-Risk`.
    pub fn category_label(self) -> &'static str {
        match self {
            Risk::Low => "Low-Risk",
            Risk::Medium => "Medium-Risk",
            Risk::High => "High-Risk",
        }
    }

    /// Parse either a risk name (`Low`) or a category label (`Low-Risk`).
    pub fn parse(s: &str) -> Option<Self> {
        let base = s.trim();
        let base = base
            .strip_suffix("-Risk")
            .or_else(|| base.strip_suffix("-risk"))
            .unwrap_or(base);
        match base.to_ascii_lowercase().as_str() {
            "low" => Some(Risk::Low),
            "medium" => Some(Risk::Medium),
            "high" => Some(Risk::High),
            _ => None,
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Risk::Low => "Low",
            Risk::Medium => "Medium",
            Risk::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolStatus {
    Active,
    Limited,
    Full,
    Disabled,
}

// ---------------------------------------------------------------------------
// ProtocolRecord — Staking pool listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRecord {
    pub id: String,
    pub name: String,
    pub protocol: String,
    pub token: String,
    pub apy: f64,
    pub min_stake: f64,
    pub total_staked: Amount,
    pub risk: Risk,
    pub status: ProtocolStatus,
    pub enabled: bool,
    pub highlighted: bool,
    pub last_updated: DateTime<Utc>,
}

impl ProtocolRecord {
    pub fn category_label(&self) -> &'static str {
        self.risk.category_label()
    }

    /// Apply every `Some` field of `patch`.
    pub fn apply(&mut self, patch: &ProtocolPatch) {
        if let Some(v) = &patch.name {
            self.name = v.clone();
        }
        if let Some(v) = &patch.protocol {
            self.protocol = v.clone();
        }
        if let Some(v) = &patch.token {
            self.token = v.clone();
        }
        if let Some(v) = patch.apy {
            self.apy = v;
        }
        if let Some(v) = patch.min_stake {
            self.min_stake = v;
        }
        if let Some(v) = &patch.total_staked {
            self.total_staked = v.clone();
        }
        if let Some(v) = patch.risk {
            self.risk = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.highlighted {
            self.highlighted = v;
        }
    }
}

/// Rejects NaN, infinite and negative values, which would not survive a
/// JSON round trip through storage.
pub fn check_quantity(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SyncError::InvalidArgument(format!(
            "{} must be a finite non-negative number, got {}",
            field, value
        )))
    }
}

/// Partial update for a [`ProtocolRecord`]; `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolPatch {
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub token: Option<String>,
    pub apy: Option<f64>,
    pub min_stake: Option<f64>,
    pub total_staked: Option<Amount>,
    pub risk: Option<Risk>,
    pub status: Option<ProtocolStatus>,
    pub enabled: Option<bool>,
    pub highlighted: Option<bool>,
}

impl ProtocolPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(apy) = self.apy {
            check_quantity("apy", apy)?;
        }
        if let Some(min_stake) = self.min_stake {
            check_quantity("minStake", min_stake)?;
        }
        if let Some(total) = &self.total_staked {
            check_quantity("totalStaked", total.value)?;
        }
        Ok(())
    }
}

/// Protocol entry as edited in the admin panel, before import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProtocol {
    pub name: String,
    pub protocol: String,
    pub token: String,
    pub apy: f64,
    #[serde(deserialize_with = "risk_or_category")]
    pub risk: Risk,
    pub status: ProtocolStatus,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub highlighted: bool,
}

fn default_true() -> bool {
    true
}

/// Admin payloads may carry either `Low` or the category label `Low-Risk`.
fn risk_or_category<'de, D>(deserializer: D) -> std::result::Result<Risk, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let raw = String::deserialize(deserializer)?;
    Risk::parse(&raw).ok_or_else(|| D::Error::custom(format!("unknown risk level {:?}", raw)))
}

// ---------------------------------------------------------------------------
// ProtocolStats — Aggregates over enabled protocols
// ---------------------------------------------------------------------------

/// Aggregates derived from the protocol list.
///
/// `total_value_locked` is in millions of the listing currency.
/// `total_stakers` is an estimate (1000 stakers per million staked), not a
/// real staker count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolStats {
    pub total_value_locked: f64,
    #[serde(alias = "highestAPY")]
    pub highest_apy: f64,
    pub active_protocols: u32,
    pub total_stakers: u64,
    pub last_calculated: DateTime<Utc>,
}

impl ProtocolStats {
    /// Recompute every aggregate from scratch.
    ///
    /// Pure: the result depends only on `protocols`. `last_calculated` is the
    /// newest `last_updated` among all records, so repeated calls over the same
    /// list are identical.
    pub fn compute(protocols: &[ProtocolRecord]) -> Self {
        let enabled: Vec<&ProtocolRecord> = protocols.iter().filter(|p| p.enabled).collect();

        let total_value_locked: f64 = enabled.iter().map(|p| p.total_staked.in_millions()).sum();
        let highest_apy = enabled.iter().map(|p| p.apy).fold(0.0_f64, f64::max);
        let last_calculated = protocols
            .iter()
            .map(|p| p.last_updated)
            .max()
            .unwrap_or_default();

        Self {
            total_value_locked: round2(total_value_locked),
            highest_apy,
            active_protocols: enabled.len() as u32,
            total_stakers: (total_value_locked * 1000.0).round() as u64,
            last_calculated,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Stats plus where they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    #[serde(flatten)]
    pub stats: ProtocolStats,
    pub is_live_data: bool,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Seed records used on first run or after a corrupt/empty registry.
pub fn default_protocols(now: DateTime<Utc>) -> Vec<ProtocolRecord> {
    vec![
        ProtocolRecord {
            id: "lido-staked-eth".into(),
            name: "Lido Staked ETH".into(),
            protocol: "Lido".into(),
            token: "stETH".into(),
            apy: 4.2,
            min_stake: 0.01,
            total_staked: Amount::usd_millions(32.5),
            risk: Risk::Low,
            status: ProtocolStatus::Active,
            enabled: true,
            highlighted: false,
            last_updated: now,
        },
        ProtocolRecord {
            id: "aave-usdc-lending".into(),
            name: "Aave USDC Lending".into(),
            protocol: "Aave".into(),
            token: "USDC".into(),
            apy: 7.8,
            min_stake: 100.0,
            total_staked: Amount::usd_millions(18.2),
            risk: Risk::Low,
            status: ProtocolStatus::Active,
            enabled: true,
            highlighted: true,
            last_updated: now,
        },
        ProtocolRecord {
            id: "curve-tricrypto".into(),
            name: "Curve Tricrypto".into(),
            protocol: "Curve".into(),
            token: "crv3crypto".into(),
            apy: 9.1,
            min_stake: 50.0,
            total_staked: Amount::usd_millions(12.7),
            risk: Risk::Medium,
            status: ProtocolStatus::Active,
            enabled: true,
            highlighted: false,
            last_updated: now,
        },
        ProtocolRecord {
            id: "gmx-glp-vault".into(),
            name: "GMX GLP Vault".into(),
            protocol: "GMX".into(),
            token: "GLP".into(),
            apy: 11.5,
            min_stake: 250.0,
            total_staked: Amount::usd_millions(8.4),
            risk: Risk::High,
            status: ProtocolStatus::Limited,
            enabled: true,
            highlighted: false,
            last_updated: now,
        },
    ]
}

/// Lowercase, ASCII-alphanumeric words joined by `-`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}
