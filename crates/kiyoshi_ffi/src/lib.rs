//! Flutter-facing bindings for `kiyoshi_core`.

pub mod api;
