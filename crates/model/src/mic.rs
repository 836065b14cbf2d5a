//! Market Identifier Code (MIC) normalization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ISO-10383-style 4-letter market identifier code, or empty when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mic(String);

/// Known exchange-name synonyms mapped to their MIC. Not exhaustive; unknown
/// exchange names fall through to the truncate-or-empty path in [`Mic::normalize`].
const EXCHANGE_SYNONYMS: &[(&str, &str)] = &[
    ("NASDAQ", "XNAS"),
    ("NASDAQGS", "XNAS"),
    ("NYSE", "XNYS"),
    ("NYSEARCA", "ARCX"),
    ("ARCA", "ARCX"),
    ("AMEX", "XASE"),
    ("NYSEAMERICAN", "XASE"),
    ("LSE", "XLON"),
    ("TSX", "XTSE"),
    ("TSE", "XTKS"),
    ("HKEX", "XHKG"),
    ("SSE", "XSHG"),
    ("SZSE", "XSHE"),
    ("ASX", "XASX"),
    ("BATS", "BATS"),
    ("OTC", "OOTC"),
    ("PNK", "OOTC"),
];

impl Mic {
    /// Returns the empty MIC, meaning "unspecified".
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Normalizes a raw exchange name or MIC code.
    ///
    /// Known exchange names are mapped via [`EXCHANGE_SYNONYMS`] first.
    /// Already-valid 4-letter uppercase codes pass through unchanged.
    /// Anything else is uppercased and truncated to 4 characters if at
    /// least 4 characters long, otherwise normalized to empty.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::empty();
        }
        let upper = trimmed.to_ascii_uppercase();
        for (name, mic) in EXCHANGE_SYNONYMS {
            if upper == *name {
                return Self((*mic).to_string());
            }
        }
        if upper.len() == 4 && upper.chars().all(|c| c.is_ascii_uppercase()) {
            return Self(upper);
        }
        if upper.len() >= 4 && upper.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Self(upper[..4].to_string());
        }
        Self::empty()
    }

    /// Returns the code as a string slice. Empty when unspecified.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no MIC could be determined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Mic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("NASDAQ", "XNAS")]
    #[case("nasdaq", "XNAS")]
    #[case("NYSE", "XNYS")]
    #[case("XNAS", "XNAS")]
    #[case("", "")]
    #[case("UNKNOWNEXCHANGE", "UNKN")]
    #[case("ab", "")]
    fn normalize_maps_known_and_unknown_inputs(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(Mic::normalize(raw).as_str(), expected);
    }

    #[test]
    fn normalize_is_idempotent_on_canonical_codes() {
        let once = Mic::normalize("NASDAQ");
        let twice = Mic::normalize(once.as_str());
        assert_eq!(once, twice);
    }
}
