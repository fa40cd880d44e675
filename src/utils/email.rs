//! A validated email address.
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)+$")
        .expect("Email regex invalid")
});

#[derive(Debug, Error)]
#[error("Invalid email address")]
pub struct InvalidEmailAddress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for EmailAddress {
    type Error = InvalidEmailAddress;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = InvalidEmailAddress;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if EMAIL_REGEX.is_match(trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(InvalidEmailAddress)
        }
    }
}

impl From<EmailAddress> for String {
    fn from(addr: EmailAddress) -> Self {
        let EmailAddress(s) = addr;
        s
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(EmailAddress::try_from("buddy@bite.me").is_ok());
        assert!(EmailAddress::try_from("first.last+food@mail.example.co.in").is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let email = EmailAddress::try_from("  buddy@bite.me ").unwrap();
        assert_eq!(email.as_str(), "buddy@bite.me");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "buddy", "buddy@", "@bite.me", "buddy@bite", "bud dy@bite.me"] {
            assert!(EmailAddress::try_from(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: Result<EmailAddress, _> = serde_json::from_str("\"buddy@bite.me\"");
        assert!(ok.is_ok());
        let bad: Result<EmailAddress, _> = serde_json::from_str("\"not-an-email\"");
        assert!(bad.is_err());
    }
}
