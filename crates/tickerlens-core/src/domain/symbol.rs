use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Longest ticker accepted, counting the `^` of index tickers.
pub const SYMBOL_MAX_LEN: usize = 15;

/// Upper-cased ticker such as `AAPL`, `BRK.B`, `^GSPC` or `EURUSD=X`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

fn allowed_at(position: usize, ch: char) -> bool {
    match position {
        0 => ch.is_ascii_alphabetic() || ch == '^',
        _ => ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '=',
    }
}

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let ticker = input.trim().to_ascii_uppercase();
        let Some(first) = ticker.chars().next() else {
            return Err(ValidationError::EmptySymbol);
        };

        let len = ticker.chars().count();
        if len > SYMBOL_MAX_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: SYMBOL_MAX_LEN,
            });
        }
        if !allowed_at(0, first) {
            return Err(ValidationError::SymbolInvalidStart { ch: first });
        }
        if let Some((index, ch)) = ticker
            .chars()
            .enumerate()
            .find(|&(index, ch)| !allowed_at(index, ch))
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index tickers carry no volume and no fundamentals.
    pub fn is_index(&self) -> bool {
        self.0.starts_with('^')
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_uppercases() {
        let symbol: Symbol = " aapl ".parse().expect("ticker");
        assert_eq!(symbol.as_str(), "AAPL");
        assert!(!symbol.is_index());
    }

    #[test]
    fn index_fx_and_share_class_tickers_are_accepted() {
        for (raw, expected) in [("^gspc", "^GSPC"), ("eurusd=x", "EURUSD=X"), ("brk.b", "BRK.B")] {
            assert_eq!(Symbol::parse(raw).expect("ticker").as_str(), expected);
        }
        assert!(Symbol::parse("^VIX").expect("index").is_index());
    }

    #[test]
    fn leading_digit_is_rejected() {
        assert_eq!(
            Symbol::parse("1AAPL"),
            Err(ValidationError::SymbolInvalidStart { ch: '1' })
        );
    }

    #[test]
    fn reports_position_of_first_bad_character() {
        assert_eq!(
            Symbol::parse("AAPL$"),
            Err(ValidationError::SymbolInvalidChar { ch: '$', index: 4 })
        );
        assert!(Symbol::parse("A^B").is_err());
    }

    #[test]
    fn blank_and_oversized_inputs_fail() {
        assert_eq!(Symbol::parse("   "), Err(ValidationError::EmptySymbol));
        assert!(matches!(
            Symbol::parse("ABCDEFGHIJKLMNOP"),
            Err(ValidationError::SymbolTooLong { len: 16, .. })
        ));
    }
}
