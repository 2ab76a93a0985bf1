//! Kiyoshi slice of the root state.

use crate::model::kiyoshi::Kiyoshi;
use crate::normalize::{denormalize_kiyoshies, DenormalizeError, NormalizedKiyoshies};
use crate::state::Action;

/// Loaded Kiyoshi records plus fetch progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KiyoshiState {
    /// True between a fetch request and its outcome.
    pub fetching: bool,
    /// Records in normalized form.
    pub data: NormalizedKiyoshies,
    /// Message of the last failed fetch, cleared by the next request.
    pub error: Option<String>,
}

impl KiyoshiState {
    /// Nested records in display order.
    pub fn kiyoshies(&self) -> Result<Vec<Kiyoshi>, DenormalizeError> {
        denormalize_kiyoshies(&self.data)
    }
}

/// Reducer for the Kiyoshi slice.
///
/// A successful fetch replaces the loaded records; a failed one keeps them.
pub fn reduce_kiyoshi(state: KiyoshiState, action: &Action) -> KiyoshiState {
    match action {
        Action::FetchKiyoshiesRequested => KiyoshiState {
            fetching: true,
            error: None,
            ..state
        },
        Action::FetchKiyoshiesSucceeded(data) => KiyoshiState {
            fetching: false,
            data: data.clone(),
            error: None,
        },
        Action::FetchKiyoshiesFailed(message) => KiyoshiState {
            fetching: false,
            error: Some(message.clone()),
            ..state
        },
        Action::KiyoshiesCleared => KiyoshiState::default(),
    }
}
