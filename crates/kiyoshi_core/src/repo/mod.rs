//! Repository layer for the local snapshot of normalized tables.
//!
//! # Responsibility
//! - Define the snapshot contract independent of the storage engine.
//! - Keep SQL details out of the store and saga code.
//!
//! # Invariants
//! - Writes replace the whole snapshot atomically.
//! - Reads reject invalid persisted rows instead of masking them.

pub mod kiyoshi_repo;
