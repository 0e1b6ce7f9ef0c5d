//! Admin-only protection for system databases.
//!
//! `protect` installs a guard table on a `DatabaseHandle` so that listing,
//! querying, single-document reads, change feeds and replication are only
//! available to server admins and to the database's own admins.

pub mod error;
pub mod config;
pub mod identity;
pub mod security;
pub mod database;
pub mod wrappers;
pub mod handle;
pub mod system_db;
pub mod testing;

pub use config::ProtectionConfig;
pub use database::{Change, Database, Feed, ReplicationEvent};
pub use error::{DbError, DbResult, PluginError};
pub use handle::DatabaseHandle;
pub use identity::{authorize, CallOptions, Decision, UserCtx, ADMIN_PARTY};
pub use security::{AccessList, SecurityDoc, SecurityStore};
pub use system_db::{authorize_or_fail, protect, protect_if_system, protect_with, unprotect};

use tracing_subscriber::{fmt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_directive`
/// when it is unset or invalid. Later calls are ignored.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
