//! A validated mobile phone number, the login identifier for users.
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

static MOBILE_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\+?[0-9]{7,15}$").expect("Mobile regex invalid"));

#[derive(Debug, Error)]
#[error("Invalid mobile number")]
pub struct InvalidMobileNumber;

/// A mobile number with separators (spaces, dashes) stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MobileNumber(String);

impl MobileNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MobileNumber {
    type Error = InvalidMobileNumber;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let normalised: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if MOBILE_REGEX.is_match(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(InvalidMobileNumber)
        }
    }
}

impl TryFrom<&str> for MobileNumber {
    type Error = InvalidMobileNumber;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_owned())
    }
}

impl From<MobileNumber> for String {
    fn from(mobile: MobileNumber) -> Self {
        mobile.0
    }
}

impl core::fmt::Display for MobileNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators() {
        let mobile = MobileNumber::try_from("+91 98765-43210").unwrap();
        assert_eq!(mobile.as_str(), "+919876543210");
    }

    #[test]
    fn rejects_letters_and_bad_lengths() {
        for bad in ["", "12345", "98765abcde", "1234567890123456", "++9876543210"] {
            assert!(MobileNumber::try_from(bad).is_err(), "{bad} should be rejected");
        }
    }
}
