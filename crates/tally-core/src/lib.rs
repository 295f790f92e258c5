//! tally-core - Core library for Tally
//!
//! This crate contains the task and habit models, the local `SQLite` store,
//! the remote entry client and the sync engine that keeps the two
//! eventually consistent. Front ends talk to [`services::EntryRepository`].

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reminder;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::{Error, RemoteError, Result};
pub use models::{Entry, EntryId};
