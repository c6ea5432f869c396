use std::fmt;

use crate::errors::ServiceError;

/// Validated collection name. Doubles as a file-name stem, so only
/// `[A-Za-z0-9_-]`, 1..=64 chars.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionName(String);

impl CollectionName {
    pub const MILITARY_RESULTS: &'static str = "military-results";
    pub const PUBLISHED_RESULTS: &'static str = "published-results";

    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        if raw.is_empty() || raw.len() > 64 {
            return Err(ServiceError::Validation("collection name must be 1-64 characters".into()));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ServiceError::Validation(format!(
                "invalid collection name `{raw}`: use letters, digits, '-' or '_'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
