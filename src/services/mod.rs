//! The two synchronization services.
//!
//! Both are shared as `Arc`s and take their [`Transport`](crate::transport::Transport)
//! and [`Storage`](crate::storage::Storage) through the constructor.

pub mod homepage;
pub mod protocol;

pub use homepage::{HomepageDataService, OverrideSync, SnapshotListener};
pub use protocol::{ProtocolListener, ProtocolSyncService};
