//! Entity-manager facade and cross-backend transaction coordination.
//!
//! # Responsibility
//! - Route persistence operations to type-bound repositories.
//! - Propagate transaction control across registered storage backends.
//!
//! # Invariants
//! - Resolution precedence is fixed: direct binding wins over the
//!   alias-via-definitions fallback.
//! - Transaction calls run in backend registration order; the first error
//!   aborts propagation (no atomicity across backends).

pub mod entity_manager;
pub mod transaction;
