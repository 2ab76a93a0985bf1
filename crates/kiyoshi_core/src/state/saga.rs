//! Action-driven background tasks.
//!
//! # Responsibility
//! - Define the `Saga` hook the store calls after each reduced action.
//! - Implement the Kiyoshi fetch flow: raw source, validation,
//!   normalization, outcome action.
//!
//! # Invariants
//! - A saga reacts only by returning follow-up actions; it never touches
//!   store state directly.
//! - Every `FetchKiyoshiesRequested` yields exactly one outcome action.

use crate::model::kiyoshi::validate_kiyoshi_list;
use crate::model::validate::ValidationError;
use crate::normalize::{
    nested_kiyoshies, normalize_kiyoshies, DenormalizeError, NormalizeError, NormalizedKiyoshies,
};
use crate::repo::kiyoshi_repo::RepoError;
use crate::state::{Action, RootState};
use log::{error, info};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Background task run by the store after the reducer.
pub trait Saga {
    /// Stable name used in log events.
    fn name(&self) -> &'static str;

    /// Reacts to `action`, already applied to `state`, with follow-up actions.
    fn on_action(&mut self, action: &Action, state: &RootState) -> Vec<Action>;
}

/// Source of raw, untrusted Kiyoshi payloads (a network response, a local
/// snapshot, a fixture).
pub trait KiyoshiSource {
    fn fetch_raw(&self) -> Result<Value, SourceError>;
}

/// Failure to produce a raw payload.
#[derive(Debug)]
pub enum SourceError {
    Unavailable(String),
    Repo(RepoError),
    Denormalize(DenormalizeError),
    Encode(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "source unavailable: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Denormalize(err) => write!(f, "{err}"),
            Self::Encode(message) => write!(f, "failed to encode payload: {message}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Denormalize(err) => Some(err),
            Self::Unavailable(_) | Self::Encode(_) => None,
        }
    }
}

impl From<RepoError> for SourceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DenormalizeError> for SourceError {
    fn from(value: DenormalizeError) -> Self {
        Self::Denormalize(value)
    }
}

/// In-memory source returning a fixed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSource {
    payload: Value,
}

impl StaticSource {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }
}

impl KiyoshiSource for StaticSource {
    fn fetch_raw(&self) -> Result<Value, SourceError> {
        Ok(self.payload.clone())
    }
}

/// Failure of one fetch run.
#[derive(Debug)]
pub enum FetchError {
    Source(SourceError),
    Validation(ValidationError),
    Normalize(NormalizeError),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "invalid kiyoshi payload: {err}"),
            Self::Normalize(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Normalize(err) => Some(err),
        }
    }
}

impl From<SourceError> for FetchError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<ValidationError> for FetchError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NormalizeError> for FetchError {
    fn from(value: NormalizeError) -> Self {
        Self::Normalize(value)
    }
}

/// Loads Kiyoshi records from a source on `FetchKiyoshiesRequested`.
pub struct FetchKiyoshiesSaga<S: KiyoshiSource> {
    source: S,
}

impl<S: KiyoshiSource> FetchKiyoshiesSaga<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Runs one fetch: raw payload, validation, normalization.
    pub fn fetch(&self) -> Result<NormalizedKiyoshies, FetchError> {
        let raw = self.source.fetch_raw()?;
        let payloads = validate_kiyoshi_list(&raw)?;
        let kiyoshies = nested_kiyoshies(payloads)?;
        Ok(normalize_kiyoshies(&kiyoshies))
    }
}

impl<S: KiyoshiSource> Saga for FetchKiyoshiesSaga<S> {
    fn name(&self) -> &'static str {
        "fetch_kiyoshies"
    }

    fn on_action(&mut self, action: &Action, _state: &RootState) -> Vec<Action> {
        if !matches!(action, Action::FetchKiyoshiesRequested) {
            return Vec::new();
        }

        let started_at = Instant::now();
        match self.fetch() {
            Ok(data) => {
                info!(
                    "event=fetch_kiyoshies module=saga status=ok count={} users={} duration_ms={}",
                    data.len(),
                    data.entities.users.len(),
                    started_at.elapsed().as_millis()
                );
                vec![Action::FetchKiyoshiesSucceeded(data)]
            }
            Err(err) => {
                error!(
                    "event=fetch_kiyoshies module=saga status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                vec![Action::FetchKiyoshiesFailed(err.to_string())]
            }
        }
    }
}
