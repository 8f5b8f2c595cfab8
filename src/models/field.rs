//! Request body fields that survive type errors.
//!
//! A body is decoded field by field: a missing key, an explicit `null` or a
//! value of the wrong type never aborts deserialization. The outcome is kept
//! in [`Field`] and reported by the `garde` rules, so one response lists every
//! problem in the body.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Missing,
    /// Present with the wrong type; holds the decoder message.
    Mismatch(String),
    Present(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Missing
    }
}

impl<T: DeserializeOwned> Field<T> {
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            return Field::Missing;
        }
        match serde_json::from_value(value) {
            Ok(v) => Field::Present(v),
            Err(e) => Field::Mismatch(e.to_string()),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Field::from_value(Value::deserialize(deserializer)?))
    }
}

impl<T> Field<T> {
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Field::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_present(self) -> Option<T> {
        match self {
            Field::Present(v) => Some(v),
            _ => None,
        }
    }
}

/// Trimmed text. Blank text stays present so length rules can reject it.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Field<String>, D::Error> {
    Ok(match Field::<String>::deserialize(deserializer)? {
        Field::Present(s) => Field::Present(s.trim().to_string()),
        other => other,
    })
}

/// Trimmed optional text; blank counts as missing.
pub fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Field<String>, D::Error> {
    Ok(match text(deserializer)? {
        Field::Present(s) if s.is_empty() => Field::Missing,
        other => other,
    })
}

/// The value of a required field, or the violation explaining its absence.
pub fn required<T>(field: &Field<T>) -> Result<&T, garde::Error> {
    match field {
        Field::Present(v) => Ok(v),
        Field::Missing => Err(garde::Error::new("field is required")),
        Field::Mismatch(message) => Err(garde::Error::new(message.clone())),
    }
}

/// The value of an optional field, if it is present and well typed.
pub fn optional<T>(field: &Field<T>) -> Result<Option<&T>, garde::Error> {
    match field {
        Field::Present(v) => Ok(Some(v)),
        Field::Missing => Ok(None),
        Field::Mismatch(message) => Err(garde::Error::new(message.clone())),
    }
}

pub fn check_length(value: &str, min: usize, max: usize) -> garde::Result {
    let chars = value.chars().count();
    if chars < min {
        if chars == 0 {
            return Err(garde::Error::new("must not be empty"));
        }
        return Err(garde::Error::new(format!("length is lower than {min}")));
    }
    if chars > max {
        return Err(garde::Error::new(format!("length is greater than {max}")));
    }
    Ok(())
}

pub fn check_range<T: PartialOrd + Display>(value: &T, min: T, max: T) -> garde::Result {
    if *value < min {
        return Err(garde::Error::new(format!("lower than {min}")));
    }
    if *value > max {
        return Err(garde::Error::new(format!("greater than {max}")));
    }
    Ok(())
}

/// Required text within `min..=max` characters.
pub fn required_text(field: &Field<String>, min: usize, max: usize) -> garde::Result {
    check_length(required(field)?, min, max)
}

/// Optional number within `min..=max`; a missing value takes its default later.
pub fn optional_range<T: PartialOrd + Display>(field: &Field<T>, min: T, max: T) -> garde::Result {
    match optional(field)? {
        Some(value) => check_range(value, min, max),
        None => Ok(()),
    }
}
