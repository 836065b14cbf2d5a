//! Currency normalization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 3-letter ISO-4217-style currency code, or empty when unknown.
///
/// Normalization uppercases the input and validates it is either empty or
/// exactly three ASCII letters. A currency is never invented; an unrecognizable
/// input is rejected rather than guessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

/// Errors produced while normalizing a currency code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CurrencyError {
    /// The input was neither empty nor exactly three ASCII letters.
    #[error("malformed currency code '{0}': expected empty or 3 ASCII letters")]
    Malformed(String),
}

impl Currency {
    /// Returns the empty currency, meaning "unspecified".
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Normalizes raw input into a [`Currency`].
    ///
    /// # Errors
    ///
    /// Returns [`CurrencyError::Malformed`] if `raw` (trimmed) is neither empty
    /// nor exactly three ASCII alphabetic characters.
    pub fn normalize(raw: &str) -> Result<Self, CurrencyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::Malformed(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice. Empty when unspecified.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no currency was specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
