//! One-time verification code entered by the user.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// Nothing was entered.
    #[error("Please enter OTP")]
    Empty,
    /// Too short or too long.
    #[error("OTP must be {min}-{max} digits")]
    WrongLength {
        /// Shortest accepted code.
        min: usize,
        /// Longest accepted code.
        max: usize,
    },
    /// Contains something other than digits.
    #[error("OTP must contain only digits")]
    NonDigit,
}

/// A one-time code as typed by the user.
///
/// The backend issues six-digit codes; shorter codes are accepted so a
/// backend switching to four-digit codes keeps working.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Shortest accepted code.
    pub const MIN_LENGTH: usize = 4;
    /// Longest accepted code (the input's `maxlength`).
    pub const MAX_LENGTH: usize = 6;

    /// Parse user input into an `OtpCode`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Empty`] for blank input, [`OtpError::WrongLength`]
    /// or [`OtpError::NonDigit`] for malformed codes.
    pub fn parse(s: &str) -> Result<Self, OtpError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OtpError::Empty);
        }
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&s.len()) {
            return Err(OtpError::WrongLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::NonDigit);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are credentials; keep them out of logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

impl std::str::FromStr for OtpCode {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
