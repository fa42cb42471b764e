//! Domain contracts shared by every persistence layer.
//!
//! # Responsibility
//! - Define the erased `Entity` contract and its identifier newtypes.
//! - Keep capability queries (identity, uniqueness, attributes) explicit.
//!
//! # Invariants
//! - Type identifiers are trim-normalized at construction and never mutated.
//! - Uniqueness is an optional capability; absence means "never unique-matched".

pub mod entity;
