//! Application state container.
//!
//! # Responsibility
//! - Hold the root state and the actions that change it.
//! - Combine per-domain reducers into one root reducer.
//! - Run action-driven background tasks (sagas) through an explicitly
//!   constructed `Store`.
//!
//! # Invariants
//! - Reducers are pure: same state and action give the same next state.
//! - Side effects live in sagas only.

pub mod kiyoshi;
pub mod saga;
pub mod store;

use crate::normalize::NormalizedKiyoshies;
use kiyoshi::{reduce_kiyoshi, KiyoshiState};

/// Every action understood by the root reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Asks the fetch saga to load Kiyoshi records.
    FetchKiyoshiesRequested,
    /// A fetch finished with validated, normalized records.
    FetchKiyoshiesSucceeded(NormalizedKiyoshies),
    /// A fetch failed; carries a user-presentable message.
    FetchKiyoshiesFailed(String),
    /// Drops every loaded record.
    KiyoshiesCleared,
}

impl Action {
    /// Short stable name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchKiyoshiesRequested => "fetch_kiyoshies_requested",
            Self::FetchKiyoshiesSucceeded(_) => "fetch_kiyoshies_succeeded",
            Self::FetchKiyoshiesFailed(_) => "fetch_kiyoshies_failed",
            Self::KiyoshiesCleared => "kiyoshies_cleared",
        }
    }
}

/// Combined state of every domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootState {
    pub kiyoshi: KiyoshiState,
}

/// Root reducer: routes `action` to every domain reducer.
pub fn reduce_root(state: RootState, action: &Action) -> RootState {
    RootState {
        kiyoshi: reduce_kiyoshi(state.kiyoshi, action),
    }
}
