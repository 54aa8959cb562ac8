//! Content type cache hooks.
//!
//! # Responsibility
//! - Serve per-type structure lists without hitting SQLite.
//! - Receive invalidations from structure writes.

pub mod content_type_cache;
