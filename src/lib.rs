//! weir: a feed-polling daemon.
//!
//! Polls RSS 2.0, Atom 0.3/1.0, JSON Feed, and RDF/RSS 1.0 feeds on a
//! schedule, normalizes them into one canonical model, deduplicates entries
//! by content hash, and persists them to SQLite.
//!
//! The crate is split along the data flow: [`scheduler`] finds due feeds and
//! hands jobs to the [`worker`] pool, whose workers drive
//! [`reader::handler`] through fetch ([`fetch`]) → detect/parse
//! ([`reader`]) → merge ([`storage`]).

pub mod config;
pub mod fetch;
pub mod model;
pub mod reader;
pub mod scheduler;
pub mod storage;
pub mod worker;
