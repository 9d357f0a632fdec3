//! View adapters over the sync services.
//!
//! Each view subscribes on construction, keeps the latest pushed state, and
//! exposes display-ready strings. Dropping a view unsubscribes it.

pub mod format;
pub mod homepage;
pub mod protocol;

pub use homepage::{
    CommunityStatsDisplay, HomepageView, MarketStatsDisplay, MarketStatsView, ViewState,
};
pub use protocol::{ProtocolData, ProtocolRow, ProtocolStatsDisplay, ProtocolStatsView, ProtocolView};
