//! System-database protection: admin-only access to listing, querying, single
//! document reads, change feeds and replication.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::config::ProtectionConfig;
use crate::database::Database;
use crate::error::{DbResult, PluginError};
use crate::handle::DatabaseHandle;
use crate::identity::{authorize, Decision, UserCtx, ADMIN_PARTY};
use crate::tprintln;
use crate::wrappers::{Guard, GuardCall, GuardTable, Operation, PassThrough};

pub const SYSTEM_WRAPPERS: &str = "system-db";

pub fn create_401(url_name: &str) -> PluginError {
    PluginError::unauthorized(format!("Only admins can access {} of system databases.", url_name))
}

/// Succeeds when `user` may run admin-only operations on `db`, otherwise fails
/// with `error`. Server admins skip the security read; everyone else costs
/// exactly one fresh `get_security`, whose errors are returned unchanged.
pub async fn authorize_or_fail(user: Option<&UserCtx>, db: &DatabaseHandle, error: &PluginError) -> DbResult<()> {
    let user = user.unwrap_or(&ADMIN_PARTY);
    if user.is_server_admin() {
        return Ok(());
    }
    let security = db.get_security().await?;
    match authorize(Some(user), &security) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(error.clone().into()),
    }
}

struct AdminOnly {
    error: PluginError,
}

#[async_trait]
impl Guard for AdminOnly {
    async fn check(&self, call: &GuardCall<'_>) -> DbResult<()> {
        let user = call.options.user_ctx.as_ref();
        let res = authorize_or_fail(user, call.db, &self.error).await;
        match &res {
            Ok(()) => debug!(
                target: "systemdb::guard",
                db = call.db.name(), op = call.op.method_name(), shape = ?call.op.shape(), user = ?user.and_then(|u| u.name.as_deref()),
                "admin-only check passed"
            ),
            Err(e) => info!(
                target: "systemdb::guard",
                db = call.db.name(), op = call.op.method_name(), shape = ?call.op.shape(), user = ?user.and_then(|u| u.name.as_deref()),
                status = e.status(), "admin-only check refused: {}", e
            ),
        }
        res
    }
}

fn admin_only(error: PluginError) -> Arc<dyn Guard> {
    Arc::new(AdminOnly { error })
}

static SYSTEM_TABLE: Lazy<Arc<GuardTable>> = Lazy::new(|| {
    Arc::new(
        GuardTable::new(SYSTEM_WRAPPERS)
            .with(Operation::AllDocs, admin_only(create_401("_all_docs")))
            .with(Operation::Changes, admin_only(create_401("_changes")))
            .with(Operation::Query, admin_only(create_401("_view (or _temp_view)")))
            .with(Operation::Sync, admin_only(create_401(".sync()")))
            .with(Operation::ReplicateFrom, admin_only(create_401(".replicate.from()")))
            .with(Operation::ReplicateTo, admin_only(create_401(".replicate.to()")))
            // 404 rather than 401: a 401 here breaks clients that only expect
            // "document absent" from a single-document read.
            .with(Operation::Get, admin_only(PluginError::not_found("missing")))
            .with(Operation::GetAttachment, Arc::new(PassThrough)),
    )
});

/// The guard table installed by `protect`.
pub fn system_wrappers() -> Arc<GuardTable> {
    SYSTEM_TABLE.clone()
}

pub fn is_protected(db: &DatabaseHandle) -> bool {
    db.wrappers().is_installed(SYSTEM_WRAPPERS)
}

pub fn protect(db: &DatabaseHandle) {
    protect_with(db, &ProtectionConfig::default())
}

/// Install the security capability (if absent) and the system guard table.
/// A handle whose guards are present but whose capability went missing gets
/// the capability back; otherwise a protected handle is left alone.
pub fn protect_with(db: &DatabaseHandle, config: &ProtectionConfig) {
    let _lifecycle = db.lifecycle_lock();
    let repaired = db.install_security_methods(&config.security_doc_id);
    if !db.wrappers().install(system_wrappers()) {
        if repaired {
            info!(target: "systemdb", "protect db='{}': security capability restored", db.name());
        } else {
            debug!(target: "systemdb", db = db.name(), "protect: already protected");
        }
        return;
    }
    info!(target: "systemdb", "protect db='{}' security_doc='{}'", db.name(), config.security_doc_id);
    tprintln!("systemdb.protect db={}", db.name());
}

/// Remove the system guard table, then the security capability. No-op when
/// the handle is not protected.
pub fn unprotect(db: &DatabaseHandle) {
    let _lifecycle = db.lifecycle_lock();
    if !db.wrappers().uninstall(SYSTEM_WRAPPERS) {
        debug!(target: "systemdb", db = db.name(), "unprotect: not protected");
        return;
    }
    db.uninstall_security_methods();
    info!(target: "systemdb", "unprotect db='{}'", db.name());
    tprintln!("systemdb.unprotect db={}", db.name());
}

/// Protect `db` only if `config` designates it a system database.
pub fn protect_if_system(db: &DatabaseHandle, config: &ProtectionConfig) -> bool {
    if !config.is_system_database(db.name()) {
        return false;
    }
    protect_with(db, config);
    true
}
