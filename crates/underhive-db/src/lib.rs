//! `PostgreSQL` persistence for the Underhive roster engine.
//!
//! The database is the system of record: roster rows with their cached
//! totals and dirty flags, the fighter and equipment tables, and the
//! append-only `actions` ledger. This crate owns every transaction
//! boundary -- the engine in `underhive-ledger` is pure and synchronous,
//! and this layer gives its validate-then-mutate discipline the same
//! guarantee across processes.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration, migrations
//! - [`roster_store`] -- Roster rows, cached-field reads, row locking
//! - [`action_store`] -- Append-only actions table (batch UNNEST inserts)
//! - [`apply`] -- The atomic apply: actions + cache updates in one
//!   transaction, multi-roster safe
//! - [`error`] -- Shared error types
//!
//! # Concurrency
//!
//! Concurrent propagation on the same roster is serialized explicitly:
//! [`apply::apply_atomic`] locks every affected roster row with
//! `SELECT ... FOR UPDATE`, in ascending id order, before writing
//! anything. The schema backs the engine's validation with CHECK
//! constraints, so malformed data fails fast at the database layer.

pub mod action_store;
pub mod apply;
pub mod error;
pub mod postgres;
pub mod roster_store;

// Re-export primary types for convenience.
pub use action_store::{ActionRow, ActionStore};
pub use apply::{apply_atomic, RosterCacheUpdate};
pub use error::DbError;
pub use postgres::{Db, PgConfig};
pub use roster_store::{fetch_for_update, RosterRow, RosterStore};
