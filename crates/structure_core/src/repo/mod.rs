//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for structures and their fields.
//! - Isolate SQLite query details from the structure service.
//!
//! # Invariants
//! - Repository writes enforce model validation before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod field_repo;
pub mod structure_repo;
