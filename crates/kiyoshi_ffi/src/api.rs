//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Exchange Kiyoshi data as JSON text in envelopes the UI can branch on.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every envelope with `ok == false` carries a non-empty `message`.

use kiyoshi_core::db::open_db;
use kiyoshi_core::{
    core_version as core_version_inner, denormalize_kiyoshies, init_logging as init_logging_inner,
    kiyoshi_table_rows, nested_kiyoshies, normalize_kiyoshies, ping as ping_inner,
    validate_kiyoshi_list, validate_normalized_kiyoshies, KiyoshiRepository, NormalizedKiyoshies,
    SqliteKiyoshiRepository, ValidationError,
};
use log::warn;
use serde_json::Value;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Outcome of validating a raw Kiyoshi list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResponse {
    pub ok: bool,
    /// Number of validated records; zero on failure.
    pub count: u32,
    /// Offending field path such as `[2].madeBy.id`; `None` on success.
    pub error_path: Option<String>,
    pub message: String,
}

/// JSON-carrying response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse {
    pub ok: bool,
    /// Result document; empty on failure.
    pub json: String,
    pub message: String,
}

impl JsonResponse {
    fn success(json: String, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            json,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            json: String::new(),
            message: message.into(),
        }
    }
}

/// One listing row: Kiyoshi id plus `said at` and `made by` texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowItem {
    pub key: String,
    pub col_values: Vec<String>,
}

/// Listing rows for the data table widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowsResponse {
    pub ok: bool,
    pub rows: Vec<TableRowItem>,
    pub message: String,
}

/// Validates a raw Kiyoshi list payload.
///
/// # FFI contract
/// - Sync call, CPU-only.
/// - Never panics; malformed JSON is reported like a validation failure.
#[flutter_rust_bridge::frb(sync)]
pub fn validate_kiyoshi_list_json(json: String) -> ValidationResponse {
    let result = parse_json(&json).and_then(|value| {
        validate_kiyoshi_list(&value).map_err(ValidationFailure::Invalid)
    });
    match result {
        Ok(payloads) => ValidationResponse {
            ok: true,
            count: u32::try_from(payloads.len()).unwrap_or(u32::MAX),
            error_path: None,
            message: "ok".to_string(),
        },
        Err(ValidationFailure::Malformed(message)) => ValidationResponse {
            ok: false,
            count: 0,
            error_path: None,
            message,
        },
        Err(ValidationFailure::Invalid(err)) => ValidationResponse {
            ok: false,
            count: 0,
            error_path: Some(err.path().to_string()),
            message: err.to_string(),
        },
    }
}

/// Validates a nested Kiyoshi list and returns its normalized JSON form.
///
/// Every record must embed its `madeBy` user.
#[flutter_rust_bridge::frb(sync)]
pub fn normalize_kiyoshies_json(json: String) -> JsonResponse {
    match normalize_json(&json) {
        Ok(normalized) => encode(&normalized, "normalized"),
        Err(message) => JsonResponse::failure(message),
    }
}

/// Rebuilds the nested Kiyoshi list from normalized JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn denormalize_kiyoshies_json(json: String) -> JsonResponse {
    let result = decode_normalized(&json).and_then(|normalized| {
        denormalize_kiyoshies(&normalized).map_err(|err| err.to_string())
    });
    match result {
        Ok(kiyoshies) => encode(&kiyoshies, "denormalized"),
        Err(message) => JsonResponse::failure(message),
    }
}

/// Builds data table rows from normalized JSON, in `result` order.
#[flutter_rust_bridge::frb(sync)]
pub fn kiyoshi_table_rows_json(json: String) -> TableRowsResponse {
    let result = decode_normalized(&json).and_then(|normalized| {
        denormalize_kiyoshies(&normalized).map_err(|err| err.to_string())
    });
    match result {
        Ok(kiyoshies) => TableRowsResponse {
            ok: true,
            rows: kiyoshi_table_rows(&kiyoshies)
                .into_iter()
                .map(|row| TableRowItem {
                    key: row.key,
                    col_values: row.col_values,
                })
                .collect(),
            message: "ok".to_string(),
        },
        Err(message) => TableRowsResponse {
            ok: false,
            rows: Vec::new(),
            message,
        },
    }
}

/// Replaces the snapshot stored at `db_path` with normalized JSON.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn snapshot_save(db_path: String, json: String) -> JsonResponse {
    let result = decode_normalized(&json).and_then(|normalized| {
        let conn = open_db(db_path.trim()).map_err(|err| format!("snapshot DB open failed: {err}"))?;
        SqliteKiyoshiRepository::new(&conn)
            .save_normalized(&normalized)
            .map_err(|err| err.to_string())?;
        Ok(normalized.len())
    });
    match result {
        Ok(count) => JsonResponse::success(String::new(), format!("saved {count} records")),
        Err(message) => {
            warn!("event=ffi_snapshot_save module=ffi status=error error={message}");
            JsonResponse::failure(message)
        }
    }
}

/// Loads the snapshot stored at `db_path` as normalized JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn snapshot_load(db_path: String) -> JsonResponse {
    let result = open_db(db_path.trim())
        .map_err(|err| format!("snapshot DB open failed: {err}"))
        .and_then(|conn| {
            SqliteKiyoshiRepository::new(&conn)
                .load_normalized()
                .map_err(|err| err.to_string())
        });
    match result {
        Ok(normalized) => encode(&normalized, "loaded"),
        Err(message) => {
            warn!("event=ffi_snapshot_load module=ffi status=error error={message}");
            JsonResponse::failure(message)
        }
    }
}

enum ValidationFailure {
    Malformed(String),
    Invalid(ValidationError),
}

fn parse_json(json: &str) -> Result<Value, ValidationFailure> {
    serde_json::from_str(json)
        .map_err(|err| ValidationFailure::Malformed(format!("malformed JSON: {err}")))
}

fn normalize_json(json: &str) -> Result<NormalizedKiyoshies, String> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| format!("malformed JSON: {err}"))?;
    let payloads = validate_kiyoshi_list(&value).map_err(|err| err.to_string())?;
    let kiyoshies = nested_kiyoshies(payloads).map_err(|err| err.to_string())?;
    Ok(normalize_kiyoshies(&kiyoshies))
}

fn decode_normalized(json: &str) -> Result<NormalizedKiyoshies, String> {
    let value: Value = serde_json::from_str(json)
        .map_err(|err| format!("malformed normalized JSON: {err}"))?;
    validate_normalized_kiyoshies(&value).map_err(|err| err.to_string())
}

fn encode<T: serde::Serialize>(value: &T, verb: &str) -> JsonResponse {
    match serde_json::to_string(value) {
        Ok(json) => JsonResponse::success(json, verb),
        Err(err) => JsonResponse::failure(format!("failed to encode result: {err}")),
    }
}
