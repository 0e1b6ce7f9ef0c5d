//! Guarded database handle.
//!
//! `DatabaseHandle` decorates a database with a per-handle security capability
//! slot and a `WrapperStack`. It implements `Database` itself: guarded
//! operations run the installed guards before delegating, everything else is
//! forwarded untouched. Handles never share guard state with each other.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;

use crate::database::{Change, Database, Feed, ReplicationEvent};
use crate::error::{DbError, DbResult};
use crate::identity::CallOptions;
use crate::security::{LocalDocSecurity, SecurityDoc, SecurityStore};
use crate::wrappers::{changeslike, GuardCall, Operation, Shape, WrapperStack};

pub struct DatabaseHandle {
    db: Arc<dyn Database>,
    security: RwLock<Option<Arc<dyn SecurityStore>>>,
    wrappers: WrapperStack,
    lifecycle: Mutex<()>,
}

impl DatabaseHandle {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db, security: RwLock::new(None), wrappers: WrapperStack::default(), lifecycle: Mutex::new(()) }
    }

    /// Held across a whole install or uninstall of a guard table together
    /// with its security capability, so the pair changes as one step.
    pub fn lifecycle_lock(&self) -> MutexGuard<'_, ()> { self.lifecycle.lock() }

    pub fn wrappers(&self) -> &WrapperStack { &self.wrappers }

    /// Attach the default local-document security store under `doc_id`.
    /// Returns false when a store is already attached.
    pub fn install_security_methods(&self, doc_id: &str) -> bool {
        self.install_security_store(Arc::new(LocalDocSecurity::with_doc_id(self.db.clone(), doc_id)))
    }

    pub fn install_security_store(&self, store: Arc<dyn SecurityStore>) -> bool {
        let mut slot = self.security.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(store);
        true
    }

    pub fn uninstall_security_methods(&self) -> bool {
        self.security.write().take().is_some()
    }

    pub fn has_security_methods(&self) -> bool { self.security.read().is_some() }

    fn security_store(&self) -> DbResult<Arc<dyn SecurityStore>> {
        self.security
            .read()
            .clone()
            .ok_or_else(|| DbError::SecurityNotInstalled { db: self.db.name().to_string() })
    }

    /// One fresh read of the security document.
    pub async fn get_security(&self) -> DbResult<SecurityDoc> {
        let store = self.security_store()?;
        store.get_security().await
    }

    pub async fn put_security(&self, doc: &SecurityDoc) -> DbResult<()> {
        let store = self.security_store()?;
        store.put_security(doc).await
    }

    async fn guard(&self, op: Operation, options: &CallOptions) -> DbResult<()> {
        self.wrappers.run(&GuardCall { op, db: self, options }).await
    }

    /// Guard and start a changes-like operation. One-shot operations are
    /// refused here; they go through `guard` and return their result directly.
    async fn start_feed<T, F, Fut>(&self, op: Operation, options: &CallOptions, start: F) -> DbResult<Feed<T>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = DbResult<Feed<T>>>,
    {
        if op.shape() != Shape::Changeslike {
            return Err(DbError::backend("bad_request".to_string(), format!("{} is not a changes-like operation", op.method_name())));
        }
        changeslike::start(self.guard(op, options), start).await
    }

    /// Emitter-style change feed: returned immediately, guarded on first poll,
    /// a denial arrives as the feed's only item.
    pub fn changes_feed(self: &Arc<Self>, options: CallOptions) -> Feed<Change> {
        let this = Arc::clone(self);
        changeslike::deferred(async move { this.changes(&options).await })
    }
}

#[async_trait]
impl Database for DatabaseHandle {
    fn name(&self) -> &str { self.db.name() }

    async fn info(&self) -> DbResult<Value> { self.db.info().await }

    async fn put(&self, doc: Value, options: &CallOptions) -> DbResult<Value> {
        self.db.put(doc, options).await
    }

    async fn all_docs(&self, options: &CallOptions) -> DbResult<Value> {
        self.guard(Operation::AllDocs, options).await?;
        self.db.all_docs(options).await
    }

    async fn query(&self, view: &str, options: &CallOptions) -> DbResult<Value> {
        self.guard(Operation::Query, options).await?;
        self.db.query(view, options).await
    }

    async fn get(&self, id: &str, options: &CallOptions) -> DbResult<Value> {
        self.guard(Operation::Get, options).await?;
        self.db.get(id, options).await
    }

    async fn get_attachment(&self, doc_id: &str, attachment_id: &str, options: &CallOptions) -> DbResult<Vec<u8>> {
        self.guard(Operation::GetAttachment, options).await?;
        self.db.get_attachment(doc_id, attachment_id, options).await
    }

    async fn changes(&self, options: &CallOptions) -> DbResult<Feed<Change>> {
        self.start_feed(Operation::Changes, options, || self.db.changes(options)).await
    }

    async fn sync(&self, remote: &str, options: &CallOptions) -> DbResult<Feed<ReplicationEvent>> {
        self.start_feed(Operation::Sync, options, || self.db.sync(remote, options)).await
    }

    async fn replicate_from(&self, source: &str, options: &CallOptions) -> DbResult<Feed<ReplicationEvent>> {
        self.start_feed(Operation::ReplicateFrom, options, || self.db.replicate_from(source, options)).await
    }

    async fn replicate_to(&self, target: &str, options: &CallOptions) -> DbResult<Feed<ReplicationEvent>> {
        self.start_feed(Operation::ReplicateTo, options, || self.db.replicate_to(target, options)).await
    }

    async fn get_local(&self, id: &str) -> DbResult<Option<Value>> { self.db.get_local(id).await }

    async fn put_local(&self, id: &str, doc: Value) -> DbResult<()> { self.db.put_local(id, doc).await }
}
