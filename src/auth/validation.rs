//! Local checks run before any network call.

use crate::error::AuthError;
use crate::models::Credentials;

pub const CREDENTIALS_REQUIRED: &str = "Email and password required";

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Login needs a non-blank email and password.
pub fn validate_login(email: &str, password: &str) -> Result<Credentials, AuthError> {
    if is_blank(email) || is_blank(password) {
        return Err(AuthError::Validation(CREDENTIALS_REQUIRED.to_string()));
    }
    Ok(Credentials::new(email.trim(), password))
}

/// Registration adds a minimum password length, checked after presence.
pub fn validate_registration(
    email: &str,
    password: &str,
    min_password_len: usize,
) -> Result<Credentials, AuthError> {
    let credentials = validate_login(email, password)?;
    if password.chars().count() < min_password_len {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            min_password_len
        )));
    }
    Ok(credentials)
}
