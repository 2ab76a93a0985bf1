//! Typed parsing primitives for untyped JSON input.
//!
//! # Responsibility
//! - Provide the field-level checks shared by every entity validator.
//! - Report the first violated constraint together with its field path.
//!
//! # Invariants
//! - Validation is all-or-nothing: callers get either a typed value or one
//!   `ValidationError`, never a partially accepted record.
//! - Helpers never log; errors propagate to the caller unchanged.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::{Uuid, Variant};

static HYPHENATED_UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid regex")
});

// Date shape accepted by joi's `isoDate()`: calendar, week and ordinal dates
// at reduced precision, an optional time of day and an optional zone. The
// pattern's lookarounds and backreferences are checked in `parse_iso_date`.
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<expanded>[-+][0-9]{2})?(?P<year>[0-9]{4})",
        r"(?:(?P<sep>-?)(?:",
        r"(?P<month>0[1-9]|1[0-2])(?:(?P<day_sep>-?)(?P<day>[12][0-9]|0[1-9]|3[01]))?",
        r"|W(?P<week>[0-4][0-9]|5[0-2])(?:-?(?P<weekday>[1-7]))?",
        r"|(?P<ordinal>00[1-9]|0[1-9][0-9]|[12][0-9]{2}|3(?:[0-5][0-9]|6[1-6]))",
        r")",
        r"(?P<time>[T\s](?:(?P<hour>[01][0-9]|2[0-3])(?:(?P<minute_sep>:?)(?P<minute>[0-5][0-9]))?|(?P<midnight>24:?00))",
        r"(?P<fraction>[.,][0-9]+)?",
        r"(?:(?P<second_sep>:?)(?P<second>[0-5][0-9])(?P<second_fraction>[.,][0-9]+)?)?",
        r"(?P<zone>Z|(?P<zone_sign>[+-])(?P<zone_hour>[01][0-9]|2[0-3])(?::?(?P<zone_minute>[0-5][0-9]))?)?",
        r")?)?$",
    ))
    .expect("valid iso date regex")
});

/// One step in a path from the validated root to the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a field inside the validated input.
///
/// Renders as `[0].madeBy.id`; the empty path renders as `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a child path pointing at object key `key`.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// Returns a child path pointing at array element `index`.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "value");
        }
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if position == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// The constraint a rejected value violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required field is absent.
    Required,
    /// The value has the wrong JSON type.
    WrongType { expected: &'static str },
    /// The object carries a key the schema does not declare.
    UnknownField,
    /// The string is not a hyphenated RFC 4122 UUID (versions 1-5).
    InvalidUuid,
    /// The string is not a valid ISO-8601 date or date-time.
    InvalidDate,
    /// The string is empty after trimming.
    EmptyString,
    /// The string exceeds the allowed number of characters.
    TooLong { max_chars: usize },
    /// The value matches none of the accepted alternatives.
    NoMatchingAlternative { expected: &'static str },
    /// An entity id differs from the table key it is stored under.
    KeyMismatch,
}

/// Validation failure carrying the offending field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    path: FieldPath,
    kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(path: FieldPath, kind: ValidationErrorKind) -> Self {
        Self { path, kind }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let path = &self.path;
        match &self.kind {
            ValidationErrorKind::Required => write!(f, "\"{path}\" is required"),
            ValidationErrorKind::WrongType { expected } => {
                write!(f, "\"{path}\" must be of type {expected}")
            }
            ValidationErrorKind::UnknownField => write!(f, "\"{path}\" is not allowed"),
            ValidationErrorKind::InvalidUuid => write!(f, "\"{path}\" must be a valid UUID"),
            ValidationErrorKind::InvalidDate => {
                write!(f, "\"{path}\" must be a valid ISO 8601 date")
            }
            ValidationErrorKind::EmptyString => {
                write!(f, "\"{path}\" is not allowed to be empty")
            }
            ValidationErrorKind::TooLong { max_chars } => write!(
                f,
                "\"{path}\" length must be less than or equal to {max_chars} characters"
            ),
            ValidationErrorKind::NoMatchingAlternative { expected } => {
                write!(f, "\"{path}\" must be one of: {expected}")
            }
            ValidationErrorKind::KeyMismatch => {
                write!(f, "\"{path}\" must match its entity table key")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn expect_object<'a>(
    value: &'a Value,
    path: &FieldPath,
) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| {
        ValidationError::new(
            path.clone(),
            ValidationErrorKind::WrongType { expected: "object" },
        )
    })
}

/// Returns a required, non-null field of `object`.
pub(crate) fn required_field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &FieldPath,
) -> Result<&'a Value, ValidationError> {
    match object.get(key) {
        Some(Value::Null) | None => Err(ValidationError::new(
            path.key(key),
            ValidationErrorKind::Required,
        )),
        Some(value) => Ok(value),
    }
}

/// Rejects keys outside `allowed`, reporting the first one in input order.
pub(crate) fn reject_unknown_fields(
    object: &Map<String, Value>,
    allowed: &[&str],
    path: &FieldPath,
) -> Result<(), ValidationError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ValidationError::new(
            path.key(key),
            ValidationErrorKind::UnknownField,
        )),
        None => Ok(()),
    }
}

pub(crate) fn expect_str<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or_else(|| {
        ValidationError::new(
            path.clone(),
            ValidationErrorKind::WrongType { expected: "string" },
        )
    })
}

/// Parses a hyphenated UUID string, accepting versions 1-5 only.
pub(crate) fn parse_uuid(value: &Value, path: &FieldPath) -> Result<Uuid, ValidationError> {
    let text = expect_str(value, path)?;
    parse_uuid_str(text)
        .ok_or_else(|| ValidationError::new(path.clone(), ValidationErrorKind::InvalidUuid))
}

pub(crate) fn parse_uuid_str(text: &str) -> Option<Uuid> {
    if !HYPHENATED_UUID_RE.is_match(text) {
        return None;
    }
    let uuid = Uuid::parse_str(text).ok()?;
    is_supported_uuid(uuid).then_some(uuid)
}

/// Whether `uuid` carries an RFC 4122 variant and a version between 1 and 5.
pub(crate) fn is_supported_uuid(uuid: Uuid) -> bool {
    uuid.get_variant() == Variant::RFC4122 && (1..=5).contains(&uuid.get_version_num())
}

/// Checks a trimmed, bounded, non-empty string.
pub(crate) fn check_text(text: &str, max_chars: usize, path: &FieldPath) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new(
            path.clone(),
            ValidationErrorKind::EmptyString,
        ));
    }
    if text.chars().count() > max_chars {
        return Err(ValidationError::new(
            path.clone(),
            ValidationErrorKind::TooLong { max_chars },
        ));
    }
    Ok(())
}

/// Whether `text` is an ISO-8601 date in a form joi's `isoDate()` accepts.
pub fn is_iso_date(text: &str) -> bool {
    parse_iso_date(text).is_some()
}

/// Parses an ISO-8601 date, date-time or reduced-precision form.
///
/// Accepts calendar (`2020`, `2020-02`, `2020-02-08`, `20200208`), week
/// (`2020-W06-6`) and ordinal (`2020-039`) dates, an optional time with
/// fractions on its last unit, `24:00`, and a `Z` or `±HH[[:]MM]` zone.
/// Values without a zone are read as UTC. Returns `None` for shapes joi
/// rejects and for dates that do not exist on the calendar.
pub fn parse_iso_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let caps = ISO_DATE_RE.captures(text)?;
    let group = |name: &str| caps.name(name).map(|m| m.as_str());
    let number = |name: &str| group(name).and_then(|value| value.parse::<u32>().ok());

    // A four-digit year directly followed by exactly two digits is ambiguous.
    let after_year = &text[caps.name("year")?.end()..];
    let bytes = after_year.as_bytes();
    if bytes.len() >= 2
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes.get(2).map_or(true, |b| !(b.is_ascii_alphanumeric() || *b == b'_'))
    {
        return None;
    }
    if group("day").is_some() && group("day_sep") != group("sep") {
        return None;
    }
    if let Some(time) = caps.name("time") {
        let is_hour_with_z = text[time.start()..]
            .strip_prefix('T')
            .and_then(|rest| rest.strip_suffix('Z'))
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));
        if is_hour_with_z {
            return None;
        }
    }
    if caps
        .name("fraction")
        .is_some_and(|fraction| text[fraction.end()..].starts_with(':'))
    {
        return None;
    }
    if group("second").is_some() && group("second_sep") != Some(group("minute_sep").unwrap_or("")) {
        return None;
    }

    let date = iso_calendar_date(&caps)?;

    let (hour, minute) = if group("midnight").is_some() {
        (24, 0)
    } else {
        (number("hour").unwrap_or(0), number("minute").unwrap_or(0))
    };
    let second = number("second").unwrap_or(0);
    let mut value = date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::seconds(
        i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second),
    ))?;

    // A fraction applies to the last unit written before it.
    let fraction_unit_secs = if group("minute").is_some() || group("midnight").is_some() {
        60
    } else {
        3600
    };
    if let Some(fraction) = group("fraction") {
        value = value.checked_add_signed(Duration::nanoseconds(
            fraction_nanos(fraction) * fraction_unit_secs,
        ))?;
    }
    if let Some(fraction) = group("second_fraction") {
        value = value.checked_add_signed(Duration::nanoseconds(fraction_nanos(fraction)))?;
    }

    let offset_secs = match group("zone_sign") {
        Some(sign) => {
            let secs = i32::try_from(
                number("zone_hour")? * 3600 + number("zone_minute").unwrap_or(0) * 60,
            )
            .ok()?;
            if sign == "-" {
                -secs
            } else {
                secs
            }
        }
        None => 0,
    };
    value
        .and_local_timezone(FixedOffset::east_opt(offset_secs)?)
        .single()
}

fn iso_calendar_date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let number = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };

    let mut year = i32::try_from(number("year")?).ok()?;
    if let Some(expanded) = caps.name("expanded").map(|m| m.as_str()) {
        let (sign, high) = expanded.split_at(1);
        year = high.parse::<i32>().ok()?.checked_mul(10_000)?.checked_add(year)?;
        if sign == "-" {
            year = -year;
        }
    }

    if let Some(week) = number("week") {
        let weekday = match number("weekday").unwrap_or(1) {
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            6 => Weekday::Sat,
            _ => Weekday::Sun,
        };
        return NaiveDate::from_isoywd_opt(year, week, weekday);
    }
    if let Some(ordinal) = number("ordinal") {
        return NaiveDate::from_yo_opt(year, ordinal);
    }
    NaiveDate::from_ymd_opt(year, number("month").unwrap_or(1), number("day").unwrap_or(1))
}

/// Nanoseconds of a `.123` style fraction, truncated to nine digits.
fn fraction_nanos(fraction: &str) -> i64 {
    let digits: String = fraction[1..].chars().take(9).collect();
    format!("{digits:0<9}").parse().unwrap_or(0)
}
