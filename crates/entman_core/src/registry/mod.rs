//! Startup-time configuration tables for repository resolution.
//!
//! # Responsibility
//! - Hold the entity-type to repository-type binding table.
//! - Expose the container definitions seam used by the alias fallback.
//!
//! # Invariants
//! - Both tables are populated once at startup and read-only afterwards.
//! - No removal operation exists on either table.

pub mod binding;
pub mod definitions;
