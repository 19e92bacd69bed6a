//! storeadmin-core - client-side state for the storefront admin.
//!
//! - `cache`: five-minute TTL cache over durable key/value storage
//! - `auth`: shared-password session guard for the `/admin` area
//! - `api`: HTTP client for the backend
//! - `storage`: key/value backends (in-memory and JSON file)
//! - `routes`: page routes and the navigation seam
//! - `config`: configuration file and environment overrides

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod routes;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthGuard, AuthState, LoginError, LoginOutcome, LoginResult};
pub use cache::{CachedData, TtlCache, CACHE_TTL_MS};
pub use config::Config;
pub use routes::{Navigator, Route, ADMIN_ROOT};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
