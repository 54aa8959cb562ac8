//! Content type domain model.
//!
//! # Responsibility
//! - Define structures (content types), their typed fields, and the user
//!   identity consulted by permission checks.
//!
//! # Invariants
//! - Every structure and field is identified by a stable UUID inode.
//! - Structures not bound to a site live under `SYSTEM_HOST`/`SYSTEM_FOLDER`.

pub mod field;
pub mod folder;
pub mod structure;
pub mod user;
