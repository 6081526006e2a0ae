//! Flaw category lookup table.
//!
//! The detailed report carries a numeric `categoryid` on every flaw but no
//! display name for it. [`CategoryMap`] resolves those identifiers. It is an
//! immutable value: build it once, hand it to the parser, share it freely.

use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;

/// Static analysis categories reported by the Veracode platform
const BUILTIN_CATEGORIES: &[(u32, &str)] = &[
    (1, "Buffer Management Errors"),
    (2, "Buffer Overflow"),
    (3, "Numeric Errors"),
    (4, "Format String"),
    (5, "Race Conditions"),
    (6, "Dangerous Functions"),
    (7, "Error Handling"),
    (8, "Untrusted Initialization"),
    (9, "Untrusted Search Path"),
    (10, "Time and State"),
    (11, "Credentials Management"),
    (12, "Authentication Issues"),
    (13, "Cryptographic Issues"),
    (14, "Insufficient Input Validation"),
    (15, "Directory Traversal"),
    (16, "Information Leakage"),
    (17, "Code Injection"),
    (18, "Command or Argument Injection"),
    (19, "SQL Injection"),
    (20, "Cross-Site Scripting (XSS)"),
    (21, "CRLF Injection"),
    (22, "Encapsulation"),
    (23, "Code Quality"),
    (24, "API Abuse"),
    (25, "Potential Backdoor"),
    (26, "Session Fixation"),
    (27, "Cross-Site Request Forgery (CSRF)"),
    (28, "Server Configuration"),
    (29, "Trust Boundary Violation"),
    (30, "Open Redirect"),
    (31, "LDAP Injection"),
    (32, "XPath Injection"),
    (33, "Deployment Configuration"),
];

/// Errors raised while loading a category table
#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("Invalid category JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid category ID '{0}': must be a non-negative integer")]
    InvalidId(String),
}

/// Immutable mapping from category ID to display name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    names: HashMap<u32, String>,
}

impl CategoryMap {
    /// The categories known to the Veracode platform
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_CATEGORIES.iter().copied())
    }

    /// A table with no entries; every lookup yields an empty name
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from `(id, name)` pairs. Later duplicates win.
    #[must_use]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            names: entries
                .into_iter()
                .map(|(id, name)| (id, name.into()))
                .collect(),
        }
    }

    /// Load a table from a JSON object such as `{"19": "SQL Injection"}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a JSON object of strings or a key
    /// is not a valid category ID.
    pub fn from_json_str(json: &str) -> Result<Self, CategoryError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Load a table from a reader yielding the same JSON shape as
    /// [`CategoryMap::from_json_str`].
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, malformed JSON or an invalid key.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, CategoryError> {
        let raw: HashMap<String, String> = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: HashMap<String, String>) -> Result<Self, CategoryError> {
        let mut names = HashMap::with_capacity(raw.len());
        for (key, name) in raw {
            let id = key
                .trim()
                .parse::<u32>()
                .map_err(|_| CategoryError::InvalidId(key.clone()))?;
            names.insert(id, name);
        }
        Ok(Self { names })
    }

    /// Layer `overrides` on top of this table, returning the merged table
    #[must_use]
    pub fn with_overrides(mut self, overrides: CategoryMap) -> Self {
        self.names.extend(overrides.names);
        self
    }

    /// Display name for `id`, or `""` when the ID is unknown
    #[must_use]
    pub fn name(&self, id: u32) -> &str {
        self.names.get(&id).map_or("", String::as_str)
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.names.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
