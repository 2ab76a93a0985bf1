//! Entity model for users and Kiyoshi records.
//!
//! # Responsibility
//! - Define canonical typed shapes for every entity the app stores.
//! - Turn untyped JSON into typed values through explicit validators.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Typed values are only produced by validators or by constructors that
//!   enforce the same rules.

pub mod kiyoshi;
pub mod user;
pub mod validate;
