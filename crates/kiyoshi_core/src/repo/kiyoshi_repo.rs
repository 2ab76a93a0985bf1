//! Kiyoshi snapshot repository and its SQLite implementation.
//!
//! # Responsibility
//! - Persist and restore `NormalizedKiyoshies` as three flat tables.
//! - Serve the persisted snapshot as a raw source for the fetch saga.
//!
//! # Invariants
//! - `kiyoshi_result` keeps the exact `result` order, duplicates included.
//! - `made_by` is stored as a plain id; dangling ids are reported only when
//!   the snapshot is denormalized.

use crate::db::DbError;
use crate::model::kiyoshi::{KiyoshiId, NormalizedKiyoshi, SaidAt};
use crate::model::user::{User, UserId};
use crate::model::validate::{parse_uuid_str, ValidationError};
use crate::normalize::{denormalize_kiyoshies, KiyoshiEntities, NormalizedKiyoshies};
use crate::state::saga::{KiyoshiSource, SourceError};
use log::info;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for snapshot persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted snapshot: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Snapshot storage contract for normalized Kiyoshi tables.
pub trait KiyoshiRepository {
    /// Replaces the stored snapshot with `snapshot`.
    fn save_normalized(&self, snapshot: &NormalizedKiyoshies) -> RepoResult<()>;
    /// Loads the stored snapshot; an empty store yields an empty snapshot.
    fn load_normalized(&self) -> RepoResult<NormalizedKiyoshies>;
    fn count_kiyoshies(&self) -> RepoResult<u64>;
    fn clear(&self) -> RepoResult<()>;
}

/// SQLite-backed snapshot repository.
pub struct SqliteKiyoshiRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKiyoshiRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KiyoshiRepository for SqliteKiyoshiRepository<'_> {
    fn save_normalized(&self, snapshot: &NormalizedKiyoshies) -> RepoResult<()> {
        for user in snapshot.entities.users.values() {
            user.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM kiyoshi_result;
             DELETE FROM kiyoshies;
             DELETE FROM users;",
        )?;

        {
            let mut insert_user = tx.prepare("INSERT INTO users (id, name) VALUES (?1, ?2);")?;
            for user in snapshot.entities.users.values() {
                insert_user.execute(params![user.id.to_string(), user.name.as_str()])?;
            }

            let mut insert_kiyoshi = tx.prepare(
                "INSERT INTO kiyoshies (id, said_at, made_by) VALUES (?1, ?2, ?3);",
            )?;
            for kiyoshi in snapshot.entities.kiyoshies.values() {
                insert_kiyoshi.execute(params![
                    kiyoshi.id.to_string(),
                    kiyoshi.said_at.as_str(),
                    kiyoshi.made_by.to_string(),
                ])?;
            }

            let mut insert_position = tx.prepare(
                "INSERT INTO kiyoshi_result (position, kiyoshi_id) VALUES (?1, ?2);",
            )?;
            for (position, id) in snapshot.result.iter().enumerate() {
                let position = i64::try_from(position).map_err(|_| {
                    RepoError::InvalidData(format!("result position {position} overflows"))
                })?;
                insert_position.execute(params![position, id.to_string()])?;
            }
        }

        tx.commit()?;
        info!(
            "event=snapshot_save module=repo status=ok kiyoshies={} users={} result_len={}",
            snapshot.entities.kiyoshies.len(),
            snapshot.entities.users.len(),
            snapshot.result.len()
        );
        Ok(())
    }

    fn load_normalized(&self) -> RepoResult<NormalizedKiyoshies> {
        let mut entities = KiyoshiEntities::default();

        let mut stmt = self.conn.prepare("SELECT id, name FROM users ORDER BY id;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id = parse_stored_id(&row.get::<_, String>("id")?, "users.id")?;
            let user = User {
                id,
                name: row.get("name")?,
            };
            user.validate()?;
            entities.users.insert(user.id, user);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, said_at, made_by FROM kiyoshies ORDER BY id;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: KiyoshiId = parse_stored_id(&row.get::<_, String>("id")?, "kiyoshies.id")?;
            let said_at_text: String = row.get("said_at")?;
            let said_at = SaidAt::parse(said_at_text.as_str()).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid timestamp `{said_at_text}` in kiyoshies.said_at"
                ))
            })?;
            let made_by: UserId =
                parse_stored_id(&row.get::<_, String>("made_by")?, "kiyoshies.made_by")?;
            entities.kiyoshies.insert(
                id,
                NormalizedKiyoshi {
                    id,
                    said_at,
                    made_by,
                },
            );
        }

        let mut stmt = self
            .conn
            .prepare("SELECT kiyoshi_id FROM kiyoshi_result ORDER BY position ASC;")?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(parse_stored_id(
                &row.get::<_, String>("kiyoshi_id")?,
                "kiyoshi_result.kiyoshi_id",
            )?);
        }

        Ok(NormalizedKiyoshies { result, entities })
    }

    fn count_kiyoshies(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kiyoshies;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative kiyoshi count {count}")))
    }

    fn clear(&self) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM kiyoshi_result;
             DELETE FROM kiyoshies;
             DELETE FROM users;",
        )?;
        tx.commit()?;
        info!("event=snapshot_clear module=repo status=ok");
        Ok(())
    }
}

impl KiyoshiSource for SqliteKiyoshiRepository<'_> {
    fn fetch_raw(&self) -> Result<Value, SourceError> {
        let snapshot = self.load_normalized()?;
        let nested = denormalize_kiyoshies(&snapshot)?;
        serde_json::to_value(nested).map_err(|err| SourceError::Encode(err.to_string()))
    }
}

fn parse_stored_id(text: &str, column: &str) -> RepoResult<Uuid> {
    parse_uuid_str(text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}
