//! Session-gated authentication for the admin area.
//!
//! This module provides:
//! - `AuthState`: the single shared authenticated flag plus bearer credential
//! - `AuthGuard`: login against the backend, rehydration from session
//!   storage, and logout
//!
//! There are no user accounts; one shared password unlocks the admin area
//! for the lifetime of the session store.

pub mod guard;
pub mod session;

pub use guard::{AuthGuard, LoginError, LoginOutcome, LoginResult};
pub use session::{AuthState, SESSION_TOKEN_KEY};
