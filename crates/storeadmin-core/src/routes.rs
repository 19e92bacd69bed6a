//! Page routes and the navigation seam.
//!
//! Page rendering lives outside this crate; what lives here is the route
//! table, the rule that everything under `/admin` sits behind the auth
//! guard, and the `Navigator` trait the guard uses to leave the admin area.

use std::sync::Arc;

/// Root of the password-gated area. `logout` navigates here.
pub const ADMIN_ROOT: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Products,
    HowToBuy,
    AdminDashboard,
    AdminProducts,
    AdminBrands,
    AdminTags,
    AdminNavigation,
    AdminSettings,
    AdminSocial,
    AdminHowToBuy,
}

impl Route {
    pub const ALL: [Route; 11] = [
        Route::Home,
        Route::Products,
        Route::HowToBuy,
        Route::AdminDashboard,
        Route::AdminProducts,
        Route::AdminBrands,
        Route::AdminTags,
        Route::AdminNavigation,
        Route::AdminSettings,
        Route::AdminSocial,
        Route::AdminHowToBuy,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Products => "/products",
            Route::HowToBuy => "/how-to-buy",
            Route::AdminDashboard => "/admin/dashboard",
            Route::AdminProducts => "/admin/products",
            Route::AdminBrands => "/admin/brands",
            Route::AdminTags => "/admin/tags",
            Route::AdminNavigation => "/admin/navigation",
            Route::AdminSettings => "/admin/settings",
            Route::AdminSocial => "/admin/social",
            Route::AdminHowToBuy => "/admin/how-to-buy",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Products => "Products",
            Route::HowToBuy => "HowToBuy",
            Route::AdminDashboard => "AdminDashboard",
            Route::AdminProducts => "AdminProducts",
            Route::AdminBrands => "AdminBrands",
            Route::AdminTags => "AdminTags",
            Route::AdminNavigation => "AdminNavigation",
            Route::AdminSettings => "AdminSettings",
            Route::AdminSocial => "AdminSocial",
            Route::AdminHowToBuy => "AdminHowToBuy",
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.path().starts_with(ADMIN_ROOT)
    }

    /// Route for a browser path. Query strings, fragments and a trailing
    /// slash are ignored; the bare admin root redirects to the dashboard.
    pub fn resolve(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        if path == ADMIN_ROOT {
            return Some(Route::AdminDashboard);
        }
        Route::ALL.into_iter().find(|r| r.path() == path)
    }
}

/// Routing collaborator. The auth guard calls it to leave the admin area.
pub trait Navigator {
    fn navigate(&self, path: &str);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }
}

/// Records every navigation, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNavigator {
    visited: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNavigator {
    pub(crate) fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_public_routes() {
        assert_eq!(Route::resolve("/"), Some(Route::Home));
        assert_eq!(Route::resolve(""), Some(Route::Home));
        assert_eq!(Route::resolve("/products"), Some(Route::Products));
        assert_eq!(Route::resolve("/how-to-buy#step-2"), Some(Route::HowToBuy));
        assert_eq!(Route::resolve("/products/?page=2"), Some(Route::Products));
    }

    #[test]
    fn test_admin_root_redirects_to_dashboard() {
        assert_eq!(Route::resolve("/admin"), Some(Route::AdminDashboard));
        assert_eq!(Route::resolve("/admin/"), Some(Route::AdminDashboard));
        assert_eq!(Route::resolve("/admin/tags"), Some(Route::AdminTags));
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(Route::resolve("/nope"), None);
        assert_eq!(Route::resolve("/admin/unknown"), None);
    }

    #[test]
    fn test_only_admin_routes_require_auth() {
        let gated: Vec<Route> = Route::ALL.into_iter().filter(Route::requires_auth).collect();
        assert_eq!(gated.len(), 8);
        assert!(!Route::Home.requires_auth());
        assert!(!Route::HowToBuy.requires_auth());
        assert!(Route::AdminHowToBuy.requires_auth());
    }

    #[test]
    fn test_paths_round_trip_through_resolve() {
        for route in Route::ALL {
            assert_eq!(Route::resolve(route.path()), Some(route), "{}", route.name());
        }
    }
}
