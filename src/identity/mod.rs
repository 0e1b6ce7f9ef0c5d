//! Caller identity and the admin-only authorization predicate.
//! Identity establishment happens elsewhere; this module only consumes it.

mod principal;
mod request_context;
mod authorizer;

pub use principal::{UserCtx, ADMIN_PARTY, SERVER_ADMIN_ROLE};
pub use request_context::CallOptions;
pub use authorizer::{authorize, is_db_admin, Decision};
