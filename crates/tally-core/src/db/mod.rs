//! Database layer for Tally

mod connection;
mod live;
mod migrations;
mod queries;
mod sqlite_store;
mod store;
mod tracking;

pub use connection::Database;
pub use live::{EntryStream, LiveQuery};
pub use sqlite_store::SqliteEntryStore;
pub use store::{EntryStore, EntryTransaction};
pub use tracking::{stamp_local_write, TrackingEntryStore};
