use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

/// The fixed symbol set admitted by the password policy.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

static PASSWORD_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9!@#$%^&*]+$").expect("password charset regex"));

/// At least 8 characters, at least one letter, one digit and one symbol from
/// the fixed set; no characters outside that set.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::new("password_too_short"));
    }
    if !PASSWORD_CHARSET.is_match(password) {
        return Err(ValidationError::new("password_charset"));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));
    if !(has_letter && has_digit && has_symbol) {
        return Err(ValidationError::new("password_composition"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[validate(length(min = 2))]
    pub display_name: String,
    #[validate(length(min = 1))]
    pub region: String,
    #[serde(default)]
    pub is_local: bool,
}

/// Login submission. `website` is a honeypot: real forms render it hidden and
/// leave it empty, so anything that fills it is automation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub website: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            website: String::new(),
        }
    }

    pub fn is_suspicious(&self) -> bool {
        !self.website.is_empty()
    }
}
