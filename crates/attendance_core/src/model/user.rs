//! User domain model.
//!
//! # Responsibility
//! - Define the employee identity the attendance workflow resolves by email.
//! - Own the one-way biometric enrollment flag.
//!
//! # Invariants
//! - `email` is stored normalized (trimmed, lowercase) and is unique.
//! - `biometric_enrolled` only ever transitions `false -> true`.
//! - `credential` is opaque to core and never logged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,64}$").expect("valid email regex")
});

/// Stable identifier for one employee record.
pub type UserId = Uuid;

/// Validation errors for user records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    InvalidEmail(String),
    EmptyDisplayName,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::EmptyDisplayName => write!(f, "display name cannot be empty"),
        }
    }
}

impl Error for UserValidationError {}

/// Employee identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    /// Normalized unique login identity.
    pub email: String,
    pub display_name: String,
    /// Credential material owned by the sign-up flow.
    #[serde(skip_serializing)]
    pub credential: Option<String>,
    pub biometric_enrolled: bool,
}

impl User {
    /// Creates a not-yet-enrolled user with a generated stable ID.
    pub fn new(email: impl AsRef<str>, display_name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            email: normalize_email(email.as_ref()),
            display_name: display_name.into(),
            credential: None,
            biometric_enrolled: false,
        }
    }

    /// Marks the device owner as biometrically enrolled.
    ///
    /// Returns `true` when this call performed the transition.
    pub fn mark_biometric_enrolled(&mut self) -> bool {
        if self.biometric_enrolled {
            return false;
        }
        self.biometric_enrolled = true;
        true
    }

    /// Validates persisted shape.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if !EMAIL_RE.is_match(&self.email) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }
        if self.display_name.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        Ok(())
    }
}

/// Normalizes an email for storage and lookup.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, User, UserValidationError};

    #[test]
    fn new_user_normalizes_email_and_starts_unenrolled() {
        let user = User::new("  Liz@Gmail.com ", "Liz");
        assert_eq!(user.email, "liz@gmail.com");
        assert!(!user.biometric_enrolled);
        user.validate().expect("user should validate");
    }

    #[test]
    fn enrollment_transition_happens_once() {
        let mut user = User::new("liz@gmail.com", "Liz");
        assert!(user.mark_biometric_enrolled());
        assert!(!user.mark_biometric_enrolled());
        assert!(user.biometric_enrolled);
    }

    #[test]
    fn validate_rejects_bad_email_and_blank_name() {
        let bad_email = User::new("not-an-email", "Liz");
        assert!(matches!(
            bad_email.validate(),
            Err(UserValidationError::InvalidEmail(_))
        ));

        let blank_name = User::new("liz@gmail.com", "   ");
        assert_eq!(
            blank_name.validate(),
            Err(UserValidationError::EmptyDisplayName)
        );
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" A@B.Co "), "a@b.co");
    }
}
