//! Normalization between nested and flat Kiyoshi representations.
//!
//! # Responsibility
//! - Flatten nested Kiyoshi lists into keyed `kiyoshies` and `users` tables.
//! - Rebuild nested lists from the flat tables.
//! - Validate untyped data in the flat shape before it is trusted.
//!
//! # Invariants
//! - `result` keeps input order, duplicates included.
//! - A user embedded in several records is stored once; the later copy wins.
//! - Denormalization never invents or drops records: a dangling reference
//!   is an error naming the missing id.

use crate::model::kiyoshi::{
    validate_kiyoshi_at, Kiyoshi, KiyoshiId, KiyoshiPayload, NormalizedKiyoshi, KIYOSHI_ENTITY_KEY,
};
use crate::model::user::{validate_user_at, User, UserId, USER_ENTITY_KEY};
use crate::model::validate::{
    expect_object, parse_uuid, parse_uuid_str, reject_unknown_fields, required_field, FieldPath,
    ValidationError, ValidationErrorKind,
};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity tables of a normalized Kiyoshi batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KiyoshiEntities {
    pub kiyoshies: BTreeMap<KiyoshiId, NormalizedKiyoshi>,
    pub users: BTreeMap<UserId, User>,
}

/// Flat storage shape: ordered ids plus entity tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedKiyoshies {
    pub result: Vec<KiyoshiId>,
    pub entities: KiyoshiEntities,
}

impl NormalizedKiyoshies {
    pub fn len(&self) -> usize {
        self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    pub fn kiyoshi(&self, id: KiyoshiId) -> Option<&NormalizedKiyoshi> {
        self.entities.kiyoshies.get(&id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.entities.users.get(&id)
    }

    /// Folds `other` into `self`.
    ///
    /// Entities from `other` overwrite entries with the same id; ids of
    /// `other.result` are appended unless `self` already holds that record.
    pub fn merge(&mut self, other: NormalizedKiyoshies) {
        for id in other.result {
            if !self.entities.kiyoshies.contains_key(&id) && !self.result.contains(&id) {
                self.result.push(id);
            }
        }
        self.entities.kiyoshies.extend(other.entities.kiyoshies);
        self.entities.users.extend(other.entities.users);
    }
}

/// Errors raised while converting between representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A payload referenced its author by id only; normalizing needs the
    /// embedded user.
    ReferenceOnly {
        index: usize,
        kiyoshi: KiyoshiId,
        user: UserId,
    },
}

impl Display for NormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceOnly {
                index,
                kiyoshi,
                user,
            } => write!(
                f,
                "kiyoshi {kiyoshi} at index {index} references user {user} without embedding it"
            ),
        }
    }
}

impl Error for NormalizeError {}

/// Errors raised when the flat tables do not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenormalizeError {
    /// `result` names a record absent from the `kiyoshies` table.
    MissingKiyoshi(KiyoshiId),
    /// A record names an author absent from the `users` table.
    MissingUser { kiyoshi: KiyoshiId, user: UserId },
}

impl Display for DenormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKiyoshi(id) => write!(f, "kiyoshi not found in entity table: {id}"),
            Self::MissingUser { kiyoshi, user } => {
                write!(f, "user {user} referenced by kiyoshi {kiyoshi} not found")
            }
        }
    }
}

impl Error for DenormalizeError {}

/// Flattens nested records into entity tables.
pub fn normalize_kiyoshies(kiyoshies: &[Kiyoshi]) -> NormalizedKiyoshies {
    let mut normalized = NormalizedKiyoshies {
        result: Vec::with_capacity(kiyoshies.len()),
        entities: KiyoshiEntities::default(),
    };

    for kiyoshi in kiyoshies {
        normalized.result.push(kiyoshi.id);
        normalized
            .entities
            .kiyoshies
            .insert(kiyoshi.id, kiyoshi.to_normalized());

        let user = &kiyoshi.made_by;
        if let Some(previous) = normalized.entities.users.insert(user.id, user.clone()) {
            if previous != *user {
                warn!(
                    "event=normalize_user_conflict module=normalize status=overwritten user_id={} kiyoshi_id={}",
                    user.id, kiyoshi.id
                );
            }
        }
    }

    normalized
}

/// Rebuilds nested records in `result` order.
///
/// # Errors
/// Fails on the first id that is missing from the `kiyoshies` table or
/// whose author is missing from the `users` table.
pub fn denormalize_kiyoshies(
    normalized: &NormalizedKiyoshies,
) -> Result<Vec<Kiyoshi>, DenormalizeError> {
    normalized
        .result
        .iter()
        .map(|id| {
            let record = normalized
                .kiyoshi(*id)
                .ok_or(DenormalizeError::MissingKiyoshi(*id))?;
            let user = normalized
                .user(record.made_by)
                .ok_or(DenormalizeError::MissingUser {
                    kiyoshi: *id,
                    user: record.made_by,
                })?;
            Ok(record.resolve(user.clone()))
        })
        .collect()
}

/// Unwraps validated payloads that all embed their author.
///
/// # Errors
/// Returns `NormalizeError::ReferenceOnly` for the first payload whose
/// author is an id only.
pub fn nested_kiyoshies(payloads: Vec<KiyoshiPayload>) -> Result<Vec<Kiyoshi>, NormalizeError> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| match payload {
            KiyoshiPayload::Nested(kiyoshi) => Ok(kiyoshi),
            KiyoshiPayload::Normalized(kiyoshi) => Err(NormalizeError::ReferenceOnly {
                index,
                kiyoshi: kiyoshi.id,
                user: kiyoshi.made_by,
            }),
        })
        .collect()
}

/// Validates untyped data in the `NormalizedKiyoshies` JSON shape.
///
/// Ids follow the same rules as nested input, every table key must equal
/// the id of the entity stored under it, and Kiyoshi records must name
/// their author by id. References between tables are not resolved here.
///
/// # Errors
/// Returns the first violated constraint, e.g.
/// `"entities.kiyoshies.<key>.id" must match its entity table key`.
pub fn validate_normalized_kiyoshies(
    value: &Value,
) -> Result<NormalizedKiyoshies, ValidationError> {
    let root = FieldPath::root();
    let object = expect_object(value, &root)?;

    let result_path = root.key("result");
    let ids = required_field(object, "result", &root)?
        .as_array()
        .ok_or_else(|| {
            ValidationError::new(
                result_path.clone(),
                ValidationErrorKind::WrongType { expected: "array" },
            )
        })?;
    let result = ids
        .iter()
        .enumerate()
        .map(|(index, id)| parse_uuid(id, &result_path.index(index)))
        .collect::<Result<Vec<_>, _>>()?;

    let entities_path = root.key("entities");
    let tables = expect_object(required_field(object, "entities", &root)?, &entities_path)?;
    let mut entities = KiyoshiEntities::default();

    let kiyoshies_path = entities_path.key(KIYOSHI_ENTITY_KEY);
    for (key, item) in entity_table(tables, KIYOSHI_ENTITY_KEY, &entities_path)? {
        let item_path = kiyoshies_path.key(key);
        let key_id = parse_table_key(key, &item_path)?;
        let record = match validate_kiyoshi_at(item, &item_path)? {
            KiyoshiPayload::Normalized(record) => record,
            KiyoshiPayload::Nested(_) => {
                return Err(ValidationError::new(
                    item_path.key("madeBy"),
                    ValidationErrorKind::NoMatchingAlternative { expected: "user id" },
                ));
            }
        };
        check_table_key(key_id, record.id, &item_path)?;
        entities.kiyoshies.insert(key_id, record);
    }

    let users_path = entities_path.key(USER_ENTITY_KEY);
    for (key, item) in entity_table(tables, USER_ENTITY_KEY, &entities_path)? {
        let item_path = users_path.key(key);
        let key_id = parse_table_key(key, &item_path)?;
        let user = validate_user_at(item, &item_path)?;
        check_table_key(key_id, user.id, &item_path)?;
        entities.users.insert(key_id, user);
    }

    reject_unknown_fields(tables, &[KIYOSHI_ENTITY_KEY, USER_ENTITY_KEY], &entities_path)?;
    reject_unknown_fields(object, &["result", "entities"], &root)?;

    Ok(NormalizedKiyoshies { result, entities })
}

fn entity_table<'a>(
    tables: &'a Map<String, Value>,
    key: &str,
    path: &FieldPath,
) -> Result<&'a Map<String, Value>, ValidationError> {
    expect_object(required_field(tables, key, path)?, &path.key(key))
}

fn parse_table_key(key: &str, path: &FieldPath) -> Result<Uuid, ValidationError> {
    parse_uuid_str(key)
        .ok_or_else(|| ValidationError::new(path.clone(), ValidationErrorKind::InvalidUuid))
}

fn check_table_key(key: Uuid, id: Uuid, path: &FieldPath) -> Result<(), ValidationError> {
    if key == id {
        Ok(())
    } else {
        Err(ValidationError::new(
            path.key("id"),
            ValidationErrorKind::KeyMismatch,
        ))
    }
}
