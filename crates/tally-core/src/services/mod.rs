//! Services shared by every Tally front end

mod repository;

pub use repository::{open_tracked_store, EntryRepository, TrackedStore};
