use serde::Serialize;

use super::identity::Identity;
use super::token::AccessToken;

/// Where the session stands in its lifecycle.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Nothing is known yet: the startup refresh has not completed.
    #[default]
    Unresolved,
    Authenticated,
    Unauthenticated,
}

/// An immutable snapshot of the client's authentication state.
///
/// Fields are private and sessions are only built through the constructors
/// below, so a token is never present without an identity and an
/// `Authenticated` status.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    #[serde(skip)]
    access_token: Option<AccessToken>,
    identity: Option<Identity>,
    status: SessionStatus,
    last_error: Option<String>,
    pending: bool,
}

impl Session {
    /// The state at process start.
    pub fn unresolved() -> Self {
        Session::default()
    }

    pub fn authenticated(access_token: AccessToken, identity: Identity) -> Self {
        Session {
            access_token: Some(access_token),
            identity: Some(identity),
            status: SessionStatus::Authenticated,
            last_error: None,
            pending: false,
        }
    }

    pub fn unauthenticated() -> Self {
        Session {
            status: SessionStatus::Unauthenticated,
            ..Session::default()
        }
    }

    /// Same session with `last_error` replaced.
    pub fn with_error(self, last_error: Option<String>) -> Self {
        Session { last_error, ..self }
    }

    /// Same session with the `pending` flag replaced.
    pub fn with_pending(self, pending: bool) -> Self {
        Session { pending, ..self }
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_resolved(&self) -> bool {
        self.status != SessionStatus::Unresolved
    }

    /// Checks the token/identity/status invariants.
    pub fn is_consistent(&self) -> bool {
        match &self.access_token {
            Some(_) => self.status == SessionStatus::Authenticated && self.identity.is_some(),
            None => self.status != SessionStatus::Authenticated,
        }
    }
}
