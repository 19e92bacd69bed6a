//! REST client for the storefront backend.
//!
//! Provides `ApiClient`, which verifies the shared admin password against
//! `POST /api/auth` and performs JSON reads for the data-fetching layer.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse, AUTH_PATH, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
