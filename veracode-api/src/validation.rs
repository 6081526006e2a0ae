//! Input validation types and utilities for defensive programming.
//!
//! Validated wrapper types make sure identifiers meet the API's requirements
//! before they are placed into a request URL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length for build identifiers
pub const MAX_BUILD_ID_LEN: usize = 20;

/// Validation errors for input data
#[derive(Debug, Error, PartialEq, Eq)]
#[must_use = "Need to handle all error enum types."]
pub enum ValidationError {
    #[error("Build ID cannot be empty")]
    EmptyBuildId,

    #[error("Build ID too long: {actual} chars (max: {max})")]
    BuildIdTooLong { actual: usize, max: usize },

    #[error("Invalid build ID '{0}': must contain only digits")]
    InvalidBuildId(String),
}

/// Validated build identifier - numeric only, which keeps it safe to embed in
/// query strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildId(String);

impl BuildId {
    /// Validates and constructs a new `BuildId`
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is empty, longer than [`MAX_BUILD_ID_LEN`]
    /// or contains anything other than ASCII digits.
    pub fn new(build_id: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = build_id.as_ref().trim();

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyBuildId);
        }

        if trimmed.len() > MAX_BUILD_ID_LEN {
            return Err(ValidationError::BuildIdTooLong {
                actual: trimmed.len(),
                max: MAX_BUILD_ID_LEN,
            });
        }

        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidBuildId(trimmed.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the build ID as a string slice
    #[must_use = "this method returns the inner value without modifying the type"]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BuildId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for BuildId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BuildId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BuildId> for String {
    fn from(value: BuildId) -> Self {
        value.0
    }
}
