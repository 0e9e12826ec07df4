use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 5;

/// Placeholder and test tokens that upstream feeds and users sometimes send
/// in place of a real ticker.
pub const RESERVED_TICKERS: &[&str] = &[
    "TEST",
    "TESTS",
    "DEMO",
    "NULL",
    "NONE",
    "NAN",
    "N/A",
    "NA",
    "INVALID",
    "UNKNOWN",
    "SAMPLE",
    "FAKE",
    "DUMMY",
    "XXX",
    "XXXX",
    "EXAMPLE",
    "TBD",
    "PLACEHOLDER",
];

/// Case-insensitive membership in [`RESERVED_TICKERS`].
pub fn is_reserved(value: &str) -> bool {
    let value = value.trim();
    RESERVED_TICKERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(value))
}

/// Exchange ticker admitted into quotes: 1-5 of `A-Z`, `0-9`, `+`, `-` and
/// never a reserved placeholder.
///
/// Parsing is strict: no trimming and no case folding, so a feed that sends
/// `"aapl "` is rejected rather than silently repaired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let len = input.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        for (index, ch) in input.chars().enumerate() {
            let valid = ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '+' || ch == '-';
            if !valid {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        if is_reserved(input) {
            return Err(ValidationError::ReservedTicker {
                value: input.to_owned(),
            });
        }

        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_punctuated_tickers() {
        for raw in ["AAPL", "F", "BRK-B", "SPY+", "X2"] {
            assert_eq!(Ticker::parse(raw).expect("valid").as_str(), raw);
        }
    }

    #[test]
    fn rejects_lowercase_and_dots() {
        assert!(matches!(
            Ticker::parse("aapl"),
            Err(ValidationError::TickerInvalidChar { ch: 'a', index: 0 })
        ));
        assert!(matches!(
            Ticker::parse("BRK.B"),
            Err(ValidationError::TickerInvalidChar { ch: '.', index: 3 })
        ));
    }

    #[test]
    fn rejects_long_and_empty() {
        assert!(matches!(
            Ticker::parse("GOOGLE"),
            Err(ValidationError::TickerTooLong { len: 6, max: 5 })
        ));
        assert_eq!(Ticker::parse(""), Err(ValidationError::EmptyTicker));
    }

    #[test]
    fn rejects_reserved_tokens() {
        assert!(matches!(
            Ticker::parse("TEST"),
            Err(ValidationError::ReservedTicker { .. })
        ));
        assert!(is_reserved("invalid"));
        assert!(is_reserved(" Demo "));
        assert!(!is_reserved("AAPL"));
    }
}
