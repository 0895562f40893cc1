//! # resume-store
//!
//! SQLite storage for service reports, section accounts and the weekly
//! aggregates derived from reports.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Weekly aggregates are never patched incrementally: every report
//! creation or deletion re-derives the affected week from the report rows.

pub mod database;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod users;
pub mod weekly;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
