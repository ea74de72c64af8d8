pub mod aggregate;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod opponent;
pub mod period;
pub mod query;
pub mod report;
pub mod roster;
pub mod snapshot;
pub mod stat_keys;
pub mod store;
pub mod window;

pub use error::{Result, StatsError, StoreError};
pub use period::{Anchor, Period, Side};
pub use store::{RecordStore, SqliteStore};
