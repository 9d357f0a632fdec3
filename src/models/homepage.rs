use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::protocol::ProtocolStats;

// ---------------------------------------------------------------------------
// ContentSnapshot — Full homepage content
// ---------------------------------------------------------------------------

/// Everything the homepage renders, replaced wholesale on each fetch.
///
/// Every section defaults when absent from a backend payload, so a snapshot
/// is always complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSnapshot {
    pub version: u32,
    pub last_updated: Option<DateTime<Utc>>,
    pub market_stats: MarketStats,
    pub community_stats: CommunityStats,
    pub protocol_stats: ProtocolStats,
    pub featured_property: FeaturedProperty,
    pub testimonials: Vec<Testimonial>,
    pub hero_section: HeroSection,
    pub social_proof: SocialProof,
    pub config: PlatformConfig,
}

impl Default for ContentSnapshot {
    fn default() -> Self {
        Self {
            version: 1,
            last_updated: None,
            market_stats: MarketStats::default(),
            community_stats: CommunityStats::default(),
            protocol_stats: ProtocolStats::default(),
            featured_property: FeaturedProperty::default(),
            testimonials: default_testimonials(),
            hero_section: HeroSection::default(),
            social_proof: SocialProof::default(),
            config: PlatformConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Section — Overridable content sections
// ---------------------------------------------------------------------------

/// Sections an admin can pin with a manual override.
///
/// `protocolStats` has no variant: it is always refreshed from live
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    MarketStats,
    CommunityStats,
    FeaturedProperty,
    Testimonials,
    Config,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::MarketStats,
        Section::CommunityStats,
        Section::FeaturedProperty,
        Section::Testimonials,
        Section::Config,
    ];

    /// Key used in URLs and JSON payloads.
    pub fn key(self) -> &'static str {
        match self {
            Section::MarketStats => "marketStats",
            Section::CommunityStats => "communityStats",
            Section::FeaturedProperty => "featuredProperty",
            Section::Testimonials => "testimonials",
            Section::Config => "config",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// OverrideFlags
// ---------------------------------------------------------------------------

/// One manual-override flag per [`Section`].
///
/// While a flag is set, live-data refreshes leave that section alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideFlags {
    pub market_stats: bool,
    pub community_stats: bool,
    pub featured_property: bool,
    pub testimonials: bool,
    pub config: bool,
}

impl OverrideFlags {
    pub fn get(&self, section: Section) -> bool {
        match section {
            Section::MarketStats => self.market_stats,
            Section::CommunityStats => self.community_stats,
            Section::FeaturedProperty => self.featured_property,
            Section::Testimonials => self.testimonials,
            Section::Config => self.config,
        }
    }

    pub fn set(&mut self, section: Section, enabled: bool) {
        let flag = match section {
            Section::MarketStats => &mut self.market_stats,
            Section::CommunityStats => &mut self.community_stats,
            Section::FeaturedProperty => &mut self.featured_property,
            Section::Testimonials => &mut self.testimonials,
            Section::Config => &mut self.config,
        };
        *flag = enabled;
    }

    pub fn any(&self) -> bool {
        Section::ALL.iter().any(|s| self.get(*s))
    }
}

// ---------------------------------------------------------------------------
// Section records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketStats {
    pub total_value_locked: f64,
    pub total_properties: u64,
    pub average_apy: f64,
    pub total_investors: u64,
    pub monthly_volume: f64,
    pub price_change_24h: f64,
}

impl Default for MarketStats {
    fn default() -> Self {
        Self {
            total_value_locked: 127_500_000.0,
            total_properties: 48,
            average_apy: 8.7,
            total_investors: 12_450,
            monthly_volume: 15_200_000.0,
            price_change_24h: 2.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunityStats {
    pub total_members: u64,
    pub active_investors: u64,
    pub countries_represented: u32,
    pub average_investment: f64,
    pub satisfaction_rate: f64,
}

impl Default for CommunityStats {
    fn default() -> Self {
        Self {
            total_members: 25_000,
            active_investors: 12_450,
            countries_represented: 47,
            average_investment: 10_240.0,
            satisfaction_rate: 98.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedProperty {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub location: String,
    pub image: String,
    pub price_per_token: f64,
    pub total_value: f64,
    pub expected_yield: f64,
    pub tokens_available: u64,
    pub total_tokens: u64,
    pub property_type: String,
    pub description: String,
}

impl Default for FeaturedProperty {
    fn default() -> Self {
        Self {
            id: "1".into(),
            name: "Marina Bay Residences".into(),
            location: "Miami, FL".into(),
            image: "/images/properties/marina-bay.jpg".into(),
            price_per_token: 50.0,
            total_value: 2_500_000.0,
            expected_yield: 9.2,
            tokens_available: 12_500,
            total_tokens: 50_000,
            property_type: "Residential".into(),
            description: "Waterfront luxury apartments with strong rental demand.".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroSection {
    pub title: String,
    pub subtitle: String,
    pub cta_text: String,
    pub cta_link: String,
    pub background_image: String,
}

impl Default for HeroSection {
    fn default() -> Self {
        Self {
            title: "Own Real Estate, One Token at a Time".into(),
            subtitle: "Invest in income-producing properties from $50 and earn rental yield."
                .into(),
            cta_text: "Start Investing".into(),
            cta_link: "/marketplace".into(),
            background_image: "/images/hero-bg.jpg".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialProof {
    pub investor_count: u64,
    pub properties_funded: u64,
    pub total_returns_paid: f64,
    pub average_rating: f64,
}

impl Default for SocialProof {
    fn default() -> Self {
        Self {
            investor_count: 12_450,
            properties_funded: 48,
            total_returns_paid: 8_900_000.0,
            average_rating: 4.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    pub auto_refresh_enabled: bool,
    pub refresh_interval_secs: u64,
    pub show_live_badge: bool,
    pub maintenance_mode: bool,
    pub currency: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            auto_refresh_enabled: true,
            refresh_interval_secs: 30,
            show_live_badge: true,
            maintenance_mode: false,
            currency: "USD".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Testimonial
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub content: String,
    pub rating: u8,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub avatar: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Payload for creating or editing a testimonial; the backend owns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub content: String,
    pub rating: u8,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub avatar: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl NewTestimonial {
    pub fn with_id(self, id: String) -> Testimonial {
        Testimonial {
            id,
            name: self.name,
            role: self.role,
            content: self.content,
            rating: self.rating,
            featured: self.featured,
            avatar: self.avatar,
            active: self.active,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_testimonials() -> Vec<Testimonial> {
    vec![
        Testimonial {
            id: "1".into(),
            name: "Sarah Chen".into(),
            role: "Software Engineer".into(),
            content: "I started with a single token and now hold stakes in six properties. \
                      The monthly rental payouts are like clockwork."
                .into(),
            rating: 5,
            featured: true,
            avatar: "/images/avatars/sarah.jpg".into(),
            active: true,
        },
        Testimonial {
            id: "2".into(),
            name: "Marcus Johnson".into(),
            role: "Small Business Owner".into(),
            content: "Finally a way to diversify into real estate without a mortgage.".into(),
            rating: 5,
            featured: false,
            avatar: "/images/avatars/marcus.jpg".into(),
            active: true,
        },
        Testimonial {
            id: "3".into(),
            name: "Elena Rodriguez".into(),
            role: "Retired Teacher".into(),
            content: "Transparent reporting and steady yields. Exactly what I wanted.".into(),
            rating: 4,
            featured: false,
            avatar: "/images/avatars/elena.jpg".into(),
            active: true,
        },
    ]
}

/// Accept ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

// ---------------------------------------------------------------------------
// LiveData — Partial snapshot returned by `/live-data`
// ---------------------------------------------------------------------------

/// Live fields are kept as raw JSON objects so partial payloads merge
/// field-by-field into the cached sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveData {
    pub market_stats: Option<serde_json::Value>,
    pub community_stats: Option<serde_json::Value>,
    pub protocol_stats: Option<serde_json::Value>,
}
