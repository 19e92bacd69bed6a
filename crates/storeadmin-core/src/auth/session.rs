use std::sync::Arc;

use tokio::sync::watch;

/// Session-storage key holding the bearer credential.
pub const SESSION_TOKEN_KEY: &str = "supabase_admin_token";

/// Shared authentication state.
///
/// Construct one per application and hand clones to every consumer; all
/// clones see the same values. Authentication is derived from the stored
/// credential, so "authenticated" and "has a credential" cannot disagree.
#[derive(Clone, Debug)]
pub struct AuthState {
    credential: Arc<watch::Sender<Option<String>>>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            credential: Arc::new(tx),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.borrow().is_some()
    }

    /// The bearer credential, present iff authenticated.
    pub fn credential(&self) -> Option<String> {
        self.credential.borrow().clone()
    }

    /// Receiver notified on every change of the credential.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.credential.subscribe()
    }

    pub(crate) fn set_authenticated(&self, token: String) {
        self.credential.send_replace(Some(token));
    }

    pub(crate) fn clear(&self) {
        self.credential.send_replace(None);
    }
}
