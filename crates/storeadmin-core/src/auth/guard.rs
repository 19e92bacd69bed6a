use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::routes::{Navigator, Route, ADMIN_ROOT};
use crate::storage::KeyValueStore;

use super::{AuthState, SESSION_TOKEN_KEY};

/// Why a login attempt did not authenticate. The display strings are the
/// messages shown to the admin.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Authentication failed, status: {0}")]
    Status(u16),

    #[error("Invalid password or server error.")]
    Rejected,

    #[error("Login request failed. Check connection.")]
    Transport(#[source] ApiError),
}

impl From<ApiError> for LoginError {
    fn from(err: ApiError) -> Self {
        match err.status() {
            Some(status) => LoginError::Status(status),
            None => LoginError::Transport(err),
        }
    }
}

pub type LoginResult = Result<(), LoginError>;

/// Serializable view of a `LoginResult` for front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LoginOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&LoginResult> for LoginOutcome {
    fn from(result: &LoginResult) -> Self {
        match result {
            Ok(()) => LoginOutcome {
                success: true,
                error: None,
            },
            Err(e) => LoginOutcome {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Password gate in front of the admin area.
///
/// Holds a clone of the shared `AuthState`; every transition goes through
/// it so all consumers observe the same result.
pub struct AuthGuard<S, N> {
    api: ApiClient,
    state: AuthState,
    session: S,
    navigator: N,
}

impl<S: KeyValueStore, N: Navigator> AuthGuard<S, N> {
    pub fn new(api: ApiClient, state: AuthState, session: S, navigator: N) -> Self {
        Self {
            api,
            state,
            session,
            navigator,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Adopt a credential left in session storage by an earlier login.
    /// Returns false, leaving state alone, when there is none.
    pub fn check_auth(&self) -> bool {
        match self.session.get_item(SESSION_TOKEN_KEY) {
            Some(token) if !token.is_empty() => {
                self.state.set_authenticated(token);
                true
            }
            _ => false,
        }
    }

    /// Verify `password` with the backend.
    ///
    /// Never fails with anything but a `LoginError`; the state only changes
    /// on success. Concurrent logins are not coordinated, the last one to
    /// finish wins.
    pub async fn login(&self, password: &str) -> LoginResult {
        let response = match self.api.verify_password(password).await {
            Ok(response) => response,
            Err(e) => {
                let err = LoginError::from(e);
                match &err {
                    LoginError::Transport(source) => error!(error = %source, "Login request failed"),
                    other => warn!(error = %other, "Login rejected by server"),
                }
                return Err(err);
            }
        };

        let Some(token) = response.into_credential() else {
            warn!("Login response carried no credential");
            return Err(LoginError::Rejected);
        };

        if let Err(e) = self.session.set_item(SESSION_TOKEN_KEY, &token) {
            warn!(error = %e, "Failed to persist session credential");
        }
        self.state.set_authenticated(token);
        info!("Admin login succeeded");
        Ok(())
    }

    /// Drop the credential and leave the admin area.
    pub fn logout(&self) {
        self.state.clear();
        if let Err(e) = self.session.remove_item(SESSION_TOKEN_KEY) {
            warn!(error = %e, "Failed to remove session credential");
        }
        info!("Admin logged out");
        self.navigator.navigate(ADMIN_ROOT);
    }

    /// Whether `route` may be shown right now. Gated routes rehydrate from
    /// session storage before deciding.
    pub fn can_access(&self, route: Route) -> bool {
        !route.requires_auth() || self.is_authenticated() || self.check_auth()
    }

    /// Backend handle authorized for privileged calls. Not wired yet, so
    /// always `None`.
    pub fn authenticated_client(&self) -> Option<ApiClient> {
        None
    }
}
