//! Identity key validation.
//!
//! Every enrolled person is keyed by a fixed-format 12-digit number. The
//! newtype is the only way to obtain one, so anything holding an
//! `IdentityKey` is known to be well-formed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Required key length in ASCII digits.
pub const IDENTITY_KEY_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid identity key {0:?}: must be exactly {IDENTITY_KEY_LEN} digits")]
pub struct IdentityError(pub String);

/// Validated identity number under which a face is enrolled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        if s.len() == IDENTITY_KEY_LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(IdentityError(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdentityKey {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> String {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        let key = IdentityKey::parse("123456789012").unwrap();
        assert_eq!(key.as_str(), "123456789012");
    }

    #[test]
    fn test_too_short() {
        assert!(IdentityKey::parse("12AB").is_err());
        assert!(IdentityKey::parse("12345678901").is_err());
    }

    #[test]
    fn test_too_long() {
        assert!(IdentityKey::parse("1234567890123").is_err());
    }

    #[test]
    fn test_non_digit() {
        assert!(IdentityKey::parse("12345678901X").is_err());
        assert!(IdentityKey::parse("123456 89012").is_err());
    }

    #[test]
    fn test_non_ascii_digits_rejected() {
        // Arabic-Indic digits are digits but not ASCII
        assert!(IdentityKey::parse("١٢٣٤٥٦٧٨٩٠١٢").is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let key = IdentityKey::parse("987654321098").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"987654321098\"");
        let back: IdentityKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let result: Result<IdentityKey, _> = serde_json::from_str("\"12AB\"");
        assert!(result.is_err());
    }
}
