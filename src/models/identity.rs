use serde::{Deserialize, Serialize};

use super::token::AccessToken;

/// The minimal user descriptor attached to an authenticated session.
///
/// `email` is known after an interactive login. A session resolved only through
/// a silent refresh may carry just the token subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    pub email: Option<String>,
    pub subject: Option<String>,
}

impl Identity {
    /// Identity after a successful login with `email`.
    pub fn from_login(email: &str, token: &AccessToken) -> Self {
        Identity {
            email: Some(email.to_string()),
            subject: token.subject(),
        }
    }

    /// Identity after a refresh: keep what we knew unless the token says
    /// it belongs to someone else.
    pub fn after_refresh(known: Option<&Identity>, token: &AccessToken) -> Self {
        let subject = token.subject();
        match known {
            Some(known) if subject.is_none() || known.subject.is_none() || known.subject == subject => {
                Identity {
                    email: known.email.clone(),
                    subject: subject.or_else(|| known.subject.clone()),
                }
            }
            _ => Identity {
                email: None,
                subject,
            },
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
