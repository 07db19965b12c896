//! Chart-of-accounts codes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Four-digit base code with an optional three-digit sub-ledger suffix.
static ACCOUNT_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}(-[0-9]{3})?$").expect("valid account code pattern"));

/// A validated chart-of-accounts code such as `"1000"` or `"2000-123"`.
///
/// Two codes are equal when their normalized strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountCode(String);

impl AccountCode {
    /// Parses an account code, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAccountCode` if the code does not match
    /// the chart-of-accounts pattern.
    pub fn new(code: &str) -> Result<Self, LedgerError> {
        let trimmed = code.trim();
        if ACCOUNT_CODE_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(LedgerError::InvalidAccountCode(code.to_string()))
        }
    }

    /// Parses a code that is known to be valid, e.g. a static mapping.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not a valid account code.
    #[must_use]
    pub fn must(code: &str) -> Self {
        match Self::new(code) {
            Ok(account) => account,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the normalized code string.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Returns the four-digit base code.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.0[..4]
    }

    /// Returns the three-digit sub-ledger suffix, if any.
    #[must_use]
    pub fn sub_ledger(&self) -> Option<&str> {
        self.0.get(5..)
    }
}

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for AccountCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AccountCode> for String {
    fn from(value: AccountCode) -> Self {
        value.0
    }
}
