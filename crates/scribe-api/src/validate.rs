//! Field validation as declarative rule tables. Each endpoint declares a
//! `&[FieldSpec]` and the engine evaluates every rule for every field,
//! collecting all failures; no rule short-circuits another. Values are
//! trimmed before the rules run and HTML-escaped before they are handed
//! back for persistence.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A single field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Response body shape for validation failures: `{ "errors": [...] }`.
#[derive(Debug, Serialize)]
pub struct ErrorsBody {
    pub errors: Vec<FieldError>,
}

pub enum Rule {
    /// Non-empty after trim.
    Required(&'static str),
    MinLen(usize, &'static str),
    MaxLen(usize, &'static str),
    Email(&'static str),
    /// Enum membership.
    OneOf(&'static [&'static str], &'static str),
    /// At least 8 chars with one lowercase, one uppercase, one digit,
    /// one symbol.
    StrongPassword(&'static str),
    /// Must equal another field's trimmed value.
    Matches(&'static str, &'static str),
}

pub struct FieldSpec {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

/// Outcome of a validation pass: sanitized values plus every failure.
pub struct Validated {
    values: HashMap<&'static str, String>,
    pub errors: Vec<FieldError>,
}

impl Validated {
    /// Sanitized (trimmed, escaped) value for a checked field.
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn into_errors_body(self) -> ErrorsBody {
        ErrorsBody {
            errors: self.errors,
        }
    }
}

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub fn run(specs: &[FieldSpec], input: &[(&'static str, &str)]) -> Validated {
    let raw: HashMap<&'static str, &str> =
        input.iter().map(|(field, value)| (*field, value.trim())).collect();

    let mut values = HashMap::new();
    let mut errors = Vec::new();

    for spec in specs {
        let value = raw.get(spec.field).copied().unwrap_or("");

        for rule in spec.rules {
            let (ok, message) = match rule {
                Rule::Required(msg) => (!value.is_empty(), msg),
                Rule::MinLen(limit, msg) => (value.chars().count() >= *limit, msg),
                Rule::MaxLen(limit, msg) => (value.chars().count() <= *limit, msg),
                Rule::Email(msg) => (EMAIL.is_match(value), msg),
                Rule::OneOf(allowed, msg) => (allowed.contains(&value), msg),
                Rule::StrongPassword(msg) => (is_strong_password(value), msg),
                Rule::Matches(other, msg) => {
                    (raw.get(other).copied().unwrap_or("") == value, msg)
                }
            };

            if !ok {
                errors.push(FieldError::new(spec.field, message));
            }
        }

        values.insert(spec.field, html_escape::encode_safe(value).into_owned());
    }

    Validated { values, errors }
}

fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| c.is_ascii_punctuation())
}
