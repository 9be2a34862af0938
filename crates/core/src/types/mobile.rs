//! Mobile number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`MobileNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MobileError {
    /// The input string is empty.
    #[error("mobile number cannot be empty")]
    Empty,
    /// The input does not have exactly ten digits.
    #[error("mobile number must be exactly {expected} digits (got {actual})")]
    WrongLength {
        /// Required number of digits.
        expected: usize,
        /// Number of characters supplied.
        actual: usize,
    },
    /// The input contains something other than ASCII digits.
    #[error("mobile number must contain only digits")]
    NonDigit,
}

/// A ten-digit mobile number.
///
/// This is the identity the backend issues OTPs against and the key used to
/// look up or create guest accounts.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Exactly 10 characters
/// - ASCII digits only (no country code, spaces or dashes)
///
/// ## Examples
///
/// ```
/// use bbqstyle_core::MobileNumber;
///
/// assert!(MobileNumber::parse("9876543210").is_ok());
/// assert!(MobileNumber::parse(" 9876543210 ").is_ok());
///
/// assert!(MobileNumber::parse("").is_err());
/// assert!(MobileNumber::parse("98765").is_err());
/// assert!(MobileNumber::parse("98765-4321").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct MobileNumber(String);

impl MobileNumber {
    /// Number of digits in a mobile number.
    pub const LENGTH: usize = 10;

    /// Parse a `MobileNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, is not exactly ten
    /// characters long, or contains non-digit characters.
    pub fn parse(s: &str) -> Result<Self, MobileError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MobileError::Empty);
        }

        if s.len() != Self::LENGTH {
            return Err(MobileError::WrongLength {
                expected: Self::LENGTH,
                actual: s.chars().count(),
            });
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MobileError::NonDigit);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the mobile number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `MobileNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Masked form for logs (e.g., `******3210`).
    #[must_use]
    pub fn masked(&self) -> String {
        let visible = self.0.get(Self::LENGTH - 4..).unwrap_or_default();
        format!("******{visible}")
    }
}

impl fmt::Display for MobileNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MobileNumber {
    type Err = MobileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MobileNumber {
    type Error = MobileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MobileNumber> for String {
    fn from(mobile: MobileNumber) -> Self {
        mobile.0
    }
}

impl AsRef<str> for MobileNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(MobileNumber::parse("9876543210").is_ok());
        assert!(MobileNumber::parse("0000000000").is_ok());
        assert_eq!(
            MobileNumber::parse("  9876543210\n").unwrap().as_str(),
            "9876543210"
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(MobileNumber::parse("   "), Err(MobileError::Empty));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            MobileNumber::parse("987654321"),
            Err(MobileError::WrongLength { expected: 10, actual: 9 })
        ));
        assert!(matches!(
            MobileNumber::parse("919876543210"),
            Err(MobileError::WrongLength { .. })
        ));
    }

    #[test]
    fn test_parse_non_digit() {
        assert_eq!(MobileNumber::parse("98765x3210"), Err(MobileError::NonDigit));
    }

    #[test]
    fn test_masked() {
        let mobile = MobileNumber::parse("9876543210").unwrap();
        assert_eq!(mobile.masked(), "******3210");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: MobileNumber = serde_json::from_str("\"9876543210\"").unwrap();
        assert_eq!(ok.as_str(), "9876543210");
        assert!(serde_json::from_str::<MobileNumber>("\"12\"").is_err());
    }
}
