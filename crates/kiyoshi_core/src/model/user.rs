//! User entity model.
//!
//! # Responsibility
//! - Define the user record referenced by Kiyoshi entries.
//! - Validate untyped user input and expose sample fixtures.
//!
//! # Invariants
//! - `id` is a version 1-5 RFC 4122 UUID and identifies the user.
//! - `name` is non-empty after trimming and at most 64 characters.

use crate::model::validate::{
    check_text, expect_object, expect_str, is_supported_uuid, parse_uuid, reject_unknown_fields,
    required_field, FieldPath, ValidationError, ValidationErrorKind,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::{uuid, Uuid};

/// Stable identifier of a user.
pub type UserId = Uuid;

/// Entity table key of users inside normalized structures.
pub const USER_ENTITY_KEY: &str = "users";

/// Upper bound for `User::name`, in characters.
pub const USER_NAME_MAX_CHARS: usize = 64;

const USER_FIELDS: &[&str] = &["id", "name"];

/// A user who can be credited with Kiyoshi records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: UserId,
    /// Display name shown in tables.
    pub name: String,
}

impl User {
    /// Creates a user with a generated identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a user with a caller-provided identifier.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: UserId, name: impl Into<String>) -> Result<Self, ValidationError> {
        let user = Self {
            id,
            name: name.into(),
        };
        user.validate()?;
        Ok(user)
    }

    /// Re-checks invariants of an already typed value.
    ///
    /// Needed on paths that bypass `validate_user`, such as rows read back
    /// from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let path = FieldPath::root();
        if !is_supported_uuid(self.id) {
            return Err(ValidationError::new(
                path.key("id"),
                ValidationErrorKind::InvalidUuid,
            ));
        }
        check_text(&self.name, USER_NAME_MAX_CHARS, &path.key("name"))
    }
}

/// Validates an untyped value as a `User`.
///
/// # Errors
/// Returns the first violated constraint with its path, e.g. `"name" is required`.
pub fn validate_user(value: &Value) -> Result<User, ValidationError> {
    validate_user_at(value, &FieldPath::root())
}

pub(crate) fn validate_user_at(value: &Value, path: &FieldPath) -> Result<User, ValidationError> {
    let object = expect_object(value, path)?;

    let id = parse_uuid(required_field(object, "id", path)?, &path.key("id"))?;

    let name_path = path.key("name");
    let name = expect_str(required_field(object, "name", path)?, &name_path)?;
    check_text(name, USER_NAME_MAX_CHARS, &name_path)?;

    reject_unknown_fields(object, USER_FIELDS, path)?;

    Ok(User {
        id,
        name: name.to_string(),
    })
}

static USER_SAMPLES: Lazy<Vec<User>> = Lazy::new(|| {
    vec![
        User {
            id: uuid!("3d1f6c5e-8f0a-4b6e-9a43-2f1c8e7d6b01"),
            name: "Hikawa".to_string(),
        },
        User {
            id: uuid!("7b2e9f40-1c3d-4e5f-8a6b-9c0d1e2f3a4b"),
            name: "Tanaka".to_string(),
        },
        User {
            id: uuid!("a5c7e9b1-3d5f-4a7c-b9e1-2d4f6a8c0e13"),
            name: "Suzuki".to_string(),
        },
        User {
            id: uuid!("e0f1a2b3-c4d5-4e6f-8a9b-0c1d2e3f4a5b"),
            name: "Sato".to_string(),
        },
    ]
});

/// Sample users for fixtures, demos and tests.
pub fn user_samples() -> &'static [User] {
    USER_SAMPLES.as_slice()
}

#[cfg(test)]
mod tests {
    use super::{user_samples, validate_user, User};
    use crate::model::validate::ValidationErrorKind;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn samples_pass_their_own_validation() {
        for user in user_samples() {
            user.validate().expect("sample user should be valid");
            let value = serde_json::to_value(user).expect("sample user serializes");
            assert_eq!(&validate_user(&value).expect("sample validates"), user);
        }
    }

    #[test]
    fn with_id_rejects_nil_uuid() {
        let err = User::with_id(Uuid::nil(), "nobody").expect_err("nil id must fail");
        assert_eq!(err.kind(), &ValidationErrorKind::InvalidUuid);
        assert_eq!(err.path().to_string(), "id");
    }

    #[test]
    fn validate_user_rejects_blank_name() {
        let err = validate_user(&json!({
            "id": "3d1f6c5e-8f0a-4b6e-9a43-2f1c8e7d6b01",
            "name": "   "
        }))
        .expect_err("blank name must fail");
        assert_eq!(err.kind(), &ValidationErrorKind::EmptyString);
        assert_eq!(err.to_string(), "\"name\" is not allowed to be empty");
    }

    #[test]
    fn validate_user_rejects_unknown_keys() {
        let err = validate_user(&json!({
            "id": "3d1f6c5e-8f0a-4b6e-9a43-2f1c8e7d6b01",
            "name": "Hikawa",
            "admin": true
        }))
        .expect_err("unknown key must fail");
        assert_eq!(err.kind(), &ValidationErrorKind::UnknownField);
        assert_eq!(err.path().to_string(), "admin");
    }
}
