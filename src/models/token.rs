use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::utils::value::value_to_string;

/// A short-lived access credential held in memory only.
///
/// The value is treated as opaque. When it happens to be a JWT, the `exp` and
/// subject claims are read without signature verification, purely as timing
/// and identity hints. Nothing here decides whether the token is trusted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

/// Claims we peek at. Everything else is ignored.
#[derive(Debug, Deserialize)]
struct PeekClaims {
    exp: Option<i64>,
    sub: Option<Value>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    fn peek(&self) -> Option<PeekClaims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<PeekClaims>(&self.0, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }

    /// Expiry from the `exp` claim, if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.peek()
            .and_then(|claims| claims.exp)
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Whether the token expires within `skew` of `now`. Opaque tokens never do.
    pub fn expires_within(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        match self.expires_at() {
            Some(expiry) => expiry <= now + skew,
            None => false,
        }
    }

    /// Subject from `sub`, falling back to a `user_id` claim.
    pub fn subject(&self) -> Option<String> {
        let mut claims = self.peek()?;
        claims
            .sub
            .or_else(|| claims.extra.remove("user_id"))
            .filter(|v| !v.is_null())
            .map(value_to_string)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}
