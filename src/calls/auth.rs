//! Explicit authentication context for the call boundary.
//!
//! The credential is held in one place with an explicit `init`/`teardown`
//! lifecycle instead of ambient global storage. The executor tears the
//! context down when an `Unauthorized` failure becomes terminal, since a
//! stale credential cannot self-heal through retries; re-authentication is
//! an external collaborator's job.

use std::sync::RwLock;

/// Shared, thread-safe holder for the bearer credential.
#[derive(Debug, Default)]
pub struct AuthContext {
    token: RwLock<Option<String>>,
}

impl AuthContext {
    /// An unauthenticated context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context already holding a credential.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Install a credential.
    pub fn init(&self, token: impl Into<String>) {
        *self.token.write().expect("auth lock poisoned") = Some(token.into());
    }

    /// Current bearer token, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.token.read().expect("auth lock poisoned").clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().expect("auth lock poisoned").is_some()
    }

    /// Discard the credential (logout).
    pub fn teardown(&self) {
        *self.token.write().expect("auth lock poisoned") = None;
    }
}
