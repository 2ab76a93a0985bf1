//! Kiyoshi entity model.
//!
//! # Responsibility
//! - Define the nested (`Kiyoshi`) and normalized (`NormalizedKiyoshi`)
//!   shapes of a time-stamped utterance record.
//! - Validate untyped input into a tagged `KiyoshiPayload`.
//! - Provide sample fixtures.
//!
//! # Invariants
//! - `id` is a version 1-5 RFC 4122 UUID and is never reused.
//! - `said_at` always holds a valid ISO-8601 string, kept verbatim.
//! - A nested record embeds its author; a normalized one only names the
//!   author id and does not own the user.

use crate::model::user::{user_samples, validate_user_at, User, UserId};
use crate::model::validate::{
    expect_object, expect_str, is_iso_date, parse_uuid, reject_unknown_fields, required_field,
    FieldPath, ValidationError, ValidationErrorKind,
};
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::{uuid, Uuid};

/// Stable identifier of a Kiyoshi record.
pub type KiyoshiId = Uuid;

/// Entity table key of Kiyoshi records inside normalized structures.
pub const KIYOSHI_ENTITY_KEY: &str = "kiyoshies";

const KIYOSHI_FIELDS: &[&str] = &["id", "saidAt", "madeBy"];

/// ISO-8601 timestamp of a Kiyoshi, stored exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SaidAt(String);

impl SaidAt {
    /// Accepts `value` when it is a valid ISO-8601 date or date-time.
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        is_iso_date(&value).then_some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SaidAt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SaidAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match Self::parse(raw.as_str()) {
            Some(said_at) => Ok(said_at),
            None => Err(D::Error::custom(format!(
                "invalid ISO 8601 timestamp `{raw}`"
            ))),
        }
    }
}

/// A Kiyoshi record with its author embedded (nested form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Kiyoshi {
    pub id: KiyoshiId,
    pub said_at: SaidAt,
    /// The user who got this Kiyoshi.
    pub made_by: User,
}

/// A Kiyoshi record that references its author by id (normalized form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NormalizedKiyoshi {
    pub id: KiyoshiId,
    pub said_at: SaidAt,
    pub made_by: UserId,
}

impl Kiyoshi {
    /// Creates a record with a generated stable id.
    pub fn new(said_at: SaidAt, made_by: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            said_at,
            made_by,
        }
    }

    /// Returns the normalized shape, replacing the author with its id.
    pub fn to_normalized(&self) -> NormalizedKiyoshi {
        NormalizedKiyoshi {
            id: self.id,
            said_at: self.said_at.clone(),
            made_by: self.made_by.id,
        }
    }
}

impl NormalizedKiyoshi {
    /// Rebuilds the nested shape with an already resolved author.
    ///
    /// The caller is responsible for `user.id == self.made_by`.
    pub fn resolve(&self, user: User) -> Kiyoshi {
        Kiyoshi {
            id: self.id,
            said_at: self.said_at.clone(),
            made_by: user,
        }
    }
}

/// A validated Kiyoshi whose author was given either inline or by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KiyoshiPayload {
    /// `madeBy` was a full user object.
    Nested(Kiyoshi),
    /// `madeBy` was a bare user id.
    Normalized(NormalizedKiyoshi),
}

impl KiyoshiPayload {
    pub fn id(&self) -> KiyoshiId {
        match self {
            Self::Nested(kiyoshi) => kiyoshi.id,
            Self::Normalized(kiyoshi) => kiyoshi.id,
        }
    }

    pub fn said_at(&self) -> &SaidAt {
        match self {
            Self::Nested(kiyoshi) => &kiyoshi.said_at,
            Self::Normalized(kiyoshi) => &kiyoshi.said_at,
        }
    }

    /// The author id, whichever form the author was given in.
    pub fn made_by_id(&self) -> UserId {
        match self {
            Self::Nested(kiyoshi) => kiyoshi.made_by.id,
            Self::Normalized(kiyoshi) => kiyoshi.made_by,
        }
    }

    pub fn as_nested(&self) -> Option<&Kiyoshi> {
        match self {
            Self::Nested(kiyoshi) => Some(kiyoshi),
            Self::Normalized(_) => None,
        }
    }

    /// Converts to the nested form, looking reference-only authors up in `users`.
    ///
    /// Returns `None` when the referenced user is not in `users`.
    pub fn into_nested(self, users: &BTreeMap<UserId, User>) -> Option<Kiyoshi> {
        match self {
            Self::Nested(kiyoshi) => Some(kiyoshi),
            Self::Normalized(kiyoshi) => users
                .get(&kiyoshi.made_by)
                .map(|user| kiyoshi.resolve(user.clone())),
        }
    }
}

/// Validates an untyped value as a Kiyoshi.
///
/// `madeBy` may be a full user object or just a user id string; the returned
/// payload variant tells which.
///
/// Re-serializing the payload reproduces the input, except that UUIDs come
/// back in canonical lowercase form. `saidAt` is kept verbatim.
///
/// # Errors
/// Returns the first violated constraint with its field path.
pub fn validate_kiyoshi(value: &Value) -> Result<KiyoshiPayload, ValidationError> {
    validate_kiyoshi_at(value, &FieldPath::root())
}

/// Validates an untyped value as a list of Kiyoshi records.
///
/// # Errors
/// Fails when `value` is not an array or when any element is invalid; the
/// error path starts with the element index.
pub fn validate_kiyoshi_list(value: &Value) -> Result<Vec<KiyoshiPayload>, ValidationError> {
    let root = FieldPath::root();
    let items = value.as_array().ok_or_else(|| {
        ValidationError::new(root.clone(), ValidationErrorKind::WrongType { expected: "array" })
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_kiyoshi_at(item, &root.index(index)))
        .collect()
}

pub(crate) fn validate_kiyoshi_at(value: &Value, path: &FieldPath) -> Result<KiyoshiPayload, ValidationError> {
    let object = expect_object(value, path)?;

    let id = parse_uuid(required_field(object, "id", path)?, &path.key("id"))?;

    let said_at_path = path.key("saidAt");
    let said_at_text = expect_str(required_field(object, "saidAt", path)?, &said_at_path)?;
    let said_at = SaidAt::parse(said_at_text)
        .ok_or_else(|| ValidationError::new(said_at_path, ValidationErrorKind::InvalidDate))?;

    let made_by_path = path.key("madeBy");
    let payload = match required_field(object, "madeBy", path)? {
        made_by @ Value::Object(_) => KiyoshiPayload::Nested(Kiyoshi {
            id,
            said_at,
            made_by: validate_user_at(made_by, &made_by_path)?,
        }),
        made_by @ Value::String(_) => KiyoshiPayload::Normalized(NormalizedKiyoshi {
            id,
            said_at,
            made_by: parse_uuid(made_by, &made_by_path)?,
        }),
        _ => {
            return Err(ValidationError::new(
                made_by_path,
                ValidationErrorKind::NoMatchingAlternative {
                    expected: "user object, user id",
                },
            ));
        }
    };

    reject_unknown_fields(object, KIYOSHI_FIELDS, path)?;
    Ok(payload)
}

static KIYOSHI_SAMPLES: Lazy<Vec<Kiyoshi>> = Lazy::new(|| {
    let users = user_samples();
    let sample = |id: Uuid, said_at: &str, user: &User| Kiyoshi {
        id,
        said_at: SaidAt(said_at.to_string()),
        made_by: user.clone(),
    };
    vec![
        sample(
            uuid!("015dd491-1b2f-4009-96d3-ae96c05b5f88"),
            "2019-10-28T06:21:21.355+0900",
            &users[0],
        ),
        sample(
            uuid!("f626d702-fbdd-46c1-a50c-728b1d630e34"),
            "2020-02-08T02:51:20.222Z",
            &users[1],
        ),
        sample(
            uuid!("43f52641-b28b-4d38-8e28-ee620e979e72"),
            "2020-02-20T12:11:00.123Z",
            &users[2],
        ),
        sample(
            uuid!("2b6a91e4-5ac5-4e9a-a679-03d9efa77e18"),
            "2020-03-12T22:41:05.444Z",
            &users[3],
        ),
    ]
});

/// Sample Kiyoshi records, one per sample user.
pub fn kiyoshi_samples() -> &'static [Kiyoshi] {
    KIYOSHI_SAMPLES.as_slice()
}

#[cfg(test)]
mod tests {
    use super::{kiyoshi_samples, SaidAt};

    #[test]
    fn samples_hold_valid_timestamps() {
        for kiyoshi in kiyoshi_samples() {
            assert!(SaidAt::parse(kiyoshi.said_at.as_str()).is_some());
        }
    }

    #[test]
    fn said_at_deserialize_rejects_garbage() {
        let err = serde_json::from_value::<SaidAt>(serde_json::json!("not a date"))
            .expect_err("garbage must be rejected");
        assert!(err.to_string().contains("invalid ISO 8601 timestamp"));
    }
}
