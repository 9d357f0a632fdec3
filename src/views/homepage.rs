use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::format::{format_currency, format_number, format_percent};
use crate::models::{
    CommunityStats, ContentSnapshot, FeaturedProperty, MarketStats, NewTestimonial,
    OverrideFlags, PlatformConfig, Section, Testimonial,
};
use crate::services::{HomepageDataService, OverrideSync};
use crate::subscribers::Subscription;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// Data plus the loading/error pair a UI renders around it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> ViewState<T> {
    pub(crate) fn new(data: T) -> Self {
        Self {
            data,
            loading: false,
            error: None,
        }
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Display records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStatsDisplay {
    pub total_value_locked: String,
    pub total_properties: String,
    pub average_apy: String,
    pub total_investors: String,
    pub monthly_volume: String,
    pub price_change_24h: String,
}

impl From<&MarketStats> for MarketStatsDisplay {
    fn from(s: &MarketStats) -> Self {
        let sign = if s.price_change_24h > 0.0 { "+" } else { "" };
        Self {
            total_value_locked: format_currency(s.total_value_locked),
            total_properties: format_number(s.total_properties),
            average_apy: format_percent(s.average_apy),
            total_investors: format_number(s.total_investors),
            monthly_volume: format_currency(s.monthly_volume),
            price_change_24h: format!("{}{}", sign, format_percent(s.price_change_24h)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStatsDisplay {
    pub total_members: String,
    pub active_investors: String,
    pub countries_represented: String,
    pub average_investment: String,
    pub satisfaction_rate: String,
}

impl From<&CommunityStats> for CommunityStatsDisplay {
    fn from(s: &CommunityStats) -> Self {
        Self {
            total_members: format_number(s.total_members),
            active_investors: format_number(s.active_investors),
            countries_represented: format_number(u64::from(s.countries_represented)),
            average_investment: format_currency(s.average_investment),
            satisfaction_rate: format_percent(s.satisfaction_rate),
        }
    }
}

// ---------------------------------------------------------------------------
// HomepageView
// ---------------------------------------------------------------------------

/// Subscribed view over [`HomepageDataService`] for the homepage and its
/// admin editor.
///
/// Every write helper turns a `false`/`None` from the service into an
/// `error` message on the view state.
pub struct HomepageView {
    service: Arc<HomepageDataService>,
    state: Arc<Mutex<ViewState<ContentSnapshot>>>,
    _subscription: Subscription,
}

impl HomepageView {
    pub fn new(service: Arc<HomepageDataService>) -> Self {
        let state = Arc::new(Mutex::new(ViewState::new(service.cached())));
        let sink = state.clone();
        let subscription = service.subscribe(move |snapshot| {
            lock(&sink).data = snapshot.clone();
        });
        Self {
            service,
            state,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> ViewState<ContentSnapshot> {
        lock(&self.state).clone()
    }

    pub fn data(&self) -> ContentSnapshot {
        lock(&self.state).data.clone()
    }

    /// Load through the service cache, recording any fetch failure.
    pub async fn load(&self) -> ContentSnapshot {
        lock(&self.state).loading = true;
        let snapshot = self.service.get_homepage_data().await;
        let error = if self.service.is_stale() {
            self.service.last_error()
        } else {
            None
        };
        let mut state = lock(&self.state);
        state.data = snapshot.clone();
        state.loading = false;
        state.error = error;
        snapshot
    }

    pub async fn refresh_live(&self) -> bool {
        let ok = self.service.fetch_live_data().await;
        self.record(ok, "Failed to refresh live data")
    }

    pub async fn update_market_stats(&self, stats: MarketStats) -> bool {
        let ok = self.service.update_market_stats(stats).await;
        self.record(ok, "Failed to update market stats")
    }

    pub async fn update_community_stats(&self, stats: CommunityStats) -> bool {
        let ok = self.service.update_community_stats(stats).await;
        self.record(ok, "Failed to update community stats")
    }

    pub async fn update_featured_property(&self, property: FeaturedProperty) -> bool {
        let ok = self.service.update_featured_property(property).await;
        self.record(ok, "Failed to update featured property")
    }

    pub async fn update_testimonials(&self, testimonials: Vec<Testimonial>) -> bool {
        let ok = self.service.update_testimonials(testimonials).await;
        self.record(ok, "Failed to update testimonials")
    }

    pub async fn update_platform_settings(&self, settings: PlatformConfig) -> bool {
        let ok = self.service.update_platform_settings(settings).await;
        self.record(ok, "Failed to update platform settings")
    }

    pub async fn add_testimonial(&self, testimonial: NewTestimonial) -> Option<Testimonial> {
        let created = self.service.add_testimonial(testimonial).await;
        self.record(created.is_some(), "Failed to add testimonial");
        created
    }

    pub async fn remove_testimonial(&self, id: &str) -> bool {
        let ok = self.service.remove_testimonial(id).await;
        self.record(ok, "Failed to remove testimonial")
    }

    pub async fn set_override(&self, section: Section, enabled: bool) -> OverrideSync {
        self.service.set_override(section, enabled).await
    }

    pub async fn reset_all_overrides(&self) -> OverrideSync {
        self.service.reset_all_overrides().await
    }

    pub fn overrides(&self) -> OverrideFlags {
        self.service.overrides()
    }

    pub fn market_stats_display(&self) -> MarketStatsDisplay {
        MarketStatsDisplay::from(&lock(&self.state).data.market_stats)
    }

    pub fn community_stats_display(&self) -> CommunityStatsDisplay {
        CommunityStatsDisplay::from(&lock(&self.state).data.community_stats)
    }

    /// Active testimonials, featured first.
    pub fn visible_testimonials(&self) -> Vec<Testimonial> {
        let state = lock(&self.state);
        let mut list: Vec<Testimonial> = state
            .data
            .testimonials
            .iter()
            .filter(|t| t.active)
            .cloned()
            .collect();
        list.sort_by_key(|t| !t.featured);
        list
    }

    fn record(&self, ok: bool, message: &str) -> bool {
        lock(&self.state).error = if ok { None } else { Some(message.to_string()) };
        ok
    }
}

// ---------------------------------------------------------------------------
// MarketStatsView
// ---------------------------------------------------------------------------

/// Read-only market stats for the stats banner.
pub struct MarketStatsView {
    service: Arc<HomepageDataService>,
    display: Arc<Mutex<MarketStatsDisplay>>,
    _subscription: Subscription,
}

impl MarketStatsView {
    pub fn new(service: Arc<HomepageDataService>) -> Self {
        let display = Arc::new(Mutex::new(MarketStatsDisplay::from(
            &service.cached().market_stats,
        )));
        let sink = display.clone();
        let subscription = service.subscribe(move |snapshot| {
            *lock(&sink) = MarketStatsDisplay::from(&snapshot.market_stats);
        });
        Self {
            service,
            display,
            _subscription: subscription,
        }
    }

    pub fn current(&self) -> MarketStatsDisplay {
        lock(&self.display).clone()
    }

    pub async fn load(&self) -> MarketStatsDisplay {
        let snapshot = self.service.get_homepage_data().await;
        let display = MarketStatsDisplay::from(&snapshot.market_stats);
        *lock(&self.display) = display.clone();
        display
    }
}
