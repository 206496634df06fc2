//! Account registration and password change rules

use crate::errors::{ErrorCode, ValidationErrors};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

pub const EMAIL_MAX_LENGTH: u64 = 254;
pub const NAME_MAX_LENGTH: u64 = 150;

/// Usernames that would shadow a fixed route under `/users/`
pub const RESERVED_USERNAMES: &[&str] = &["me", "subscriptions", "set_password"];

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("static username pattern"));

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegistrationPayload {
    #[serde(default)]
    #[validate(
        email(message = "enter a valid email address"),
        length(max = 254, message = "email is limited to 254 characters")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "username must be 1 to 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "first name must be 1 to 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "last name must be 1 to 150 characters"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPasswordPayload {
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub new_password: String,

    #[serde(default)]
    pub current_password: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_PATTERN.is_match(username) {
        return Err(ValidationError::new("username_pattern")
            .with_message("username may contain only letters, digits and .@+-_".into()));
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Err(ValidationError::new("username_reserved")
            .with_message(format!("username '{}' is reserved", username).into()));
    }
    Ok(())
}

impl RegistrationPayload {
    /// Every violation, keyed by field
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = self.validate() {
            errors.merge_validator(&e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl SetPasswordPayload {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = self.validate() {
            errors.merge_validator(&e);
        }
        if self.current_password.is_empty() {
            errors.add("current_password", ErrorCode::MissingField, "current password is required");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
