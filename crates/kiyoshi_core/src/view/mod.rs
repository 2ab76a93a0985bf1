//! Presentation state models.
//!
//! Widgets live in the UI shell; this module owns the state they render
//! and the transitions their events trigger.

pub mod data_table;
