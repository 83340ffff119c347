//! SQLite backend for Doppel.
//!
//! One database file holds the dedup index (`dedup_records` and
//! `dedup_signatures`), the decision table (`dedup_reject`) and a
//! `resources` table that stands in for the system of record. Access goes
//! through [`tokio_rusqlite`] so queries run off the async runtime.

mod encode;
mod filter;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteConnector, SqliteStore};
