//! Access control collaborators for structure queries.
//!
//! # Responsibility
//! - Decide read/write visibility of structures per user and role.
//! - Express license tiers that hide enterprise structure types.

pub mod license;
pub mod permission;
