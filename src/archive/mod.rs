//! Durable storage for markets and positions surviving process restarts.
//!
//! The engine's operations are specified independent of the storage engine;
//! this module is the SQLite implementation, written through from the
//! engine on every accepted mutation and read once at startup.

mod connection;
mod model;
mod schema;
mod store;

pub use connection::{create_pool, run_migrations, DbPool, MIGRATIONS};
pub use store::{ArchiveSnapshot, MarketArchive};
