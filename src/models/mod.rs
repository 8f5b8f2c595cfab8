pub mod comment;
pub mod description;
pub mod field;
pub mod image;
pub mod response;

/// Serde helpers that normalise incoming strings before validation.
pub(crate) mod trimmed {
    use serde::{Deserialize, Deserializer};

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(String::deserialize(deserializer)?.trim().to_string())
    }

    pub fn optional<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}
