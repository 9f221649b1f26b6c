//! SQLite persistence for feeds, entries, enclosures, and icons.
//!
//! The ingestion core treats this module as its storage collaborator: the
//! handler and scheduler only ever call the operations exposed here and
//! never touch SQL themselves. Concurrency discipline (row locking, upsert
//! atomicity) is the database's problem, not the worker pool's.

mod categories;
mod entries;
mod feeds;
mod icons;
mod jobs;
mod schema;

pub use schema::{Database, DatabaseError};
