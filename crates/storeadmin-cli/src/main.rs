//! storeadmin - terminal front end for the storefront admin area.
//!
//! Logs in with the shared admin password, reports session status, checks
//! route access and inspects the local data cache.

use std::io;

use anyhow::{bail, Context, Result};
use storeadmin_core::{
    ApiClient, AuthGuard, AuthState, Config, FileStore, LoginOutcome, Navigator, Route, TtlCache,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

const SESSION_FILE: &str = "session.json";
const CACHE_FILE: &str = "cache.json";

const USAGE: &str = "\
Usage: storeadmin <command>

Commands:
  login [--json]              Log in to the admin area
  logout                      Log out
  status                      Show session and cache status
  route <path>                Resolve a page path and check access
  fetch <path>                GET a backend path through the cache
  cache list                  List cached entries and their age
  cache get <key>             Print a cached value
  cache evict <key>           Remove one cached entry
  cache evict-prefix <prefix> Remove every entry whose key starts with <prefix>";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Login { json: bool },
    Logout,
    Status,
    Route(String),
    Fetch(String),
    CacheList,
    CacheGet(String),
    CacheEvict(String),
    CacheEvictPrefix(String),
}

impl Command {
    /// Command for the arguments after the program name, `None` if unknown.
    fn parse(args: &[&str]) -> Option<Command> {
        let command = match args {
            [] | ["help"] | ["--help"] | ["-h"] => Command::Help,
            ["login"] => Command::Login { json: false },
            ["login", "--json"] => Command::Login { json: true },
            ["logout"] => Command::Logout,
            ["status"] => Command::Status,
            ["route", path] => Command::Route(path.to_string()),
            ["fetch", path] => Command::Fetch(path.to_string()),
            ["cache", "list"] => Command::CacheList,
            ["cache", "get", key] => Command::CacheGet(key.to_string()),
            ["cache", "evict", key] => Command::CacheEvict(key.to_string()),
            ["cache", "evict-prefix", prefix] => Command::CacheEvictPrefix(prefix.to_string()),
            _ => return None,
        };
        Some(command)
    }
}

/// There is no page to leave in a terminal; report where a browser would go.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Navigating");
        println!("Returning to {}", path);
    }
}

struct App {
    api: ApiClient,
    guard: AuthGuard<FileStore, TerminalNavigator>,
    cache: TtlCache<FileStore>,
}

impl App {
    fn new() -> Result<Self> {
        let config = Config::load()?;
        info!(api = config.api_base_url(), "Loaded configuration");

        let api = ApiClient::new(config.api_base_url(), config.request_timeout())
            .context("Failed to build HTTP client")?;

        let session = FileStore::open(config.session_dir()?.join(SESSION_FILE))
            .context("Failed to open session store")?;
        let durable = FileStore::open(config.cache_dir()?.join(CACHE_FILE))
            .context("Failed to open cache store")?;

        let guard = AuthGuard::new(api.clone(), AuthState::new(), session, TerminalNavigator);
        guard.check_auth();

        Ok(Self {
            api,
            guard,
            cache: TtlCache::new(durable),
        })
    }

    async fn login(&self, json: bool) -> Result<()> {
        let password = rpassword::prompt_password("Admin password: ")
            .context("Failed to read password")?;
        let result = self.guard.login(&password).await;

        if json {
            println!("{}", serde_json::to_string(&LoginOutcome::from(&result))?);
        }
        match result {
            Ok(()) => {
                if !json {
                    println!("Logged in.");
                }
                Ok(())
            }
            Err(e) => bail!(e),
        }
    }

    fn status(&self) {
        if self.guard.is_authenticated() {
            println!("Authenticated");
        } else {
            println!("Not authenticated");
        }
        let entries = self.cache.entries();
        let fresh = entries.iter().filter(|e| !e.expired).count();
        println!("Cache: {} entries ({} fresh)", entries.len(), fresh);
    }

    fn route(&self, path: &str) -> Result<()> {
        let Some(route) = Route::resolve(path) else {
            bail!("No page at {}", path);
        };
        let gate = if route.requires_auth() { "admin" } else { "public" };
        let access = if self.guard.can_access(route) { "allowed" } else { "login required" };
        println!("{} ({}) [{}] {}", route.name(), route.path(), gate, access);
        Ok(())
    }

    async fn fetch(&self, path: &str) -> Result<()> {
        let value: serde_json::Value = self
            .cache
            .get_or_fetch(path, || self.api.get_json(path))
            .await
            .with_context(|| format!("Failed to fetch {}", path))?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    fn cache_list(&self) {
        let entries = self.cache.entries();
        if entries.is_empty() {
            println!("Cache is empty");
        }
        for entry in entries {
            let state = if entry.expired { " (expired)" } else { "" };
            println!("{:<40} {}{}", entry.key, entry.age_display, state);
        }
    }

    fn cache_get(&self, key: &str) -> Result<()> {
        match self.cache.get::<serde_json::Value>(key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("No fresh entry for {}", key),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let command = match Command::parse(&args) {
        Some(Command::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Some(command) => command,
        None => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", args.join(" "))
        }
    };

    let app = App::new()?;

    match command {
        Command::Help => Ok(()),
        Command::Login { json } => app.login(json).await,
        Command::Logout => {
            app.guard.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            app.status();
            Ok(())
        }
        Command::Route(path) => app.route(&path),
        Command::Fetch(path) => app.fetch(&path).await,
        Command::CacheList => {
            app.cache_list();
            Ok(())
        }
        Command::CacheGet(key) => app.cache_get(&key),
        Command::CacheEvict(key) => {
            app.cache.evict(&key);
            println!("Evicted {}", key);
            Ok(())
        }
        Command::CacheEvictPrefix(prefix) => {
            let removed = app.cache.evict_by_prefix(&prefix);
            println!("Evicted {} entries", removed);
            Ok(())
        }
    }
}
