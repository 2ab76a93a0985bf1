//! Core data layer for the Kiyoshi listing app.
//!
//! Owns the entity model, its validation and normalization contract, the
//! application store and the table selection model. UI shells talk to it
//! through `kiyoshi_ffi`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod repo;
pub mod state;
pub mod view;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::kiyoshi::{
    kiyoshi_samples, validate_kiyoshi, validate_kiyoshi_list, Kiyoshi, KiyoshiId, KiyoshiPayload,
    NormalizedKiyoshi, SaidAt, KIYOSHI_ENTITY_KEY,
};
pub use model::user::{user_samples, validate_user, User, UserId, USER_ENTITY_KEY};
pub use model::validate::{FieldPath, PathSegment, ValidationError, ValidationErrorKind};
pub use normalize::{
    denormalize_kiyoshies, nested_kiyoshies, normalize_kiyoshies, validate_normalized_kiyoshies,
    DenormalizeError, KiyoshiEntities, NormalizeError, NormalizedKiyoshies,
};
pub use repo::kiyoshi_repo::{KiyoshiRepository, RepoError, RepoResult, SqliteKiyoshiRepository};
pub use state::saga::{FetchError, FetchKiyoshiesSaga, KiyoshiSource, Saga, SourceError, StaticSource};
pub use state::store::{ListenerId, Store, StoreConfig, StoreError};
pub use state::{Action, RootState};
pub use view::data_table::{
    kiyoshi_table_columns, kiyoshi_table_rows, DataRow, DataTable, DataTableFormData, FormFields,
    SelectAllState, TableBody, TableView,
};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
