//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, permission, cache and event collaborators
//!   into content type use-cases.

pub mod default_structures;
pub mod pagination;
pub mod structure_service;
