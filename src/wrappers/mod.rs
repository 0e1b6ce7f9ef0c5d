//! Generic interception facility: named guard tables installed per handle.
//! A guard is a single before-start hook; one-shot and streaming operations
//! share it, so both shapes get the same decision at the same point.

pub mod changeslike;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::DbResult;
use crate::handle::DatabaseHandle;
use crate::identity::CallOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    OneShot,
    Changeslike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AllDocs,
    Query,
    Changes,
    Sync,
    ReplicateFrom,
    ReplicateTo,
    Get,
    GetAttachment,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::AllDocs,
        Operation::Query,
        Operation::Changes,
        Operation::Sync,
        Operation::ReplicateFrom,
        Operation::ReplicateTo,
        Operation::Get,
        Operation::GetAttachment,
    ];

    pub fn method_name(self) -> &'static str {
        match self {
            Operation::AllDocs => "allDocs",
            Operation::Query => "query",
            Operation::Changes => "changes",
            Operation::Sync => "sync",
            Operation::ReplicateFrom => "replicate.from",
            Operation::ReplicateTo => "replicate.to",
            Operation::Get => "get",
            Operation::GetAttachment => "getAttachment",
        }
    }

    pub fn shape(self) -> Shape {
        match self {
            Operation::Changes | Operation::Sync | Operation::ReplicateFrom | Operation::ReplicateTo => Shape::Changeslike,
            _ => Shape::OneShot,
        }
    }
}

/// Everything a guard sees about the intercepted call.
pub struct GuardCall<'a> {
    pub op: Operation,
    pub db: &'a DatabaseHandle,
    pub options: &'a CallOptions,
}

#[async_trait]
pub trait Guard: Send + Sync {
    /// Ok lets the call through; Err fails it before the operation starts.
    async fn check(&self, call: &GuardCall<'_>) -> DbResult<()>;
}

/// Lets every call through unchanged.
pub struct PassThrough;

#[async_trait]
impl Guard for PassThrough {
    async fn check(&self, _call: &GuardCall<'_>) -> DbResult<()> { Ok(()) }
}

pub struct GuardTable {
    name: &'static str,
    guards: HashMap<Operation, Arc<dyn Guard>>,
}

impl GuardTable {
    pub fn new(name: &'static str) -> Self {
        Self { name, guards: HashMap::new() }
    }

    pub fn with(mut self, op: Operation, guard: Arc<dyn Guard>) -> Self {
        self.guards.insert(op, guard);
        self
    }

    pub fn name(&self) -> &'static str { self.name }

    pub fn get(&self, op: Operation) -> Option<&Arc<dyn Guard>> { self.guards.get(&op) }

    pub fn covers(&self, op: Operation) -> bool { self.guards.contains_key(&op) }
}

impl std::fmt::Debug for GuardTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ops: Vec<&'static str> = self.guards.keys().map(|op| op.method_name()).collect();
        ops.sort_unstable();
        f.debug_struct("GuardTable").field("name", &self.name).field("ops", &ops).finish()
    }
}

/// Ordered set of guard tables installed on one handle. Tables run in install
/// order, so the most recently installed table wraps innermost.
#[derive(Default)]
pub struct WrapperStack {
    tables: RwLock<Vec<Arc<GuardTable>>>,
}

impl WrapperStack {
    /// Returns false (and changes nothing) when a table of that name is already installed.
    pub fn install(&self, table: Arc<GuardTable>) -> bool {
        let mut tables = self.tables.write();
        if tables.iter().any(|t| t.name() == table.name()) {
            return false;
        }
        tables.push(table);
        true
    }

    /// Returns false when no table of that name is installed.
    pub fn uninstall(&self, name: &str) -> bool {
        let mut tables = self.tables.write();
        let before = tables.len();
        tables.retain(|t| t.name() != name);
        tables.len() != before
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.tables.read().iter().any(|t| t.name() == name)
    }

    pub fn installed(&self) -> Vec<&'static str> {
        self.tables.read().iter().map(|t| t.name()).collect()
    }

    /// Run every installed guard for `call.op`. The stack is snapshotted up
    /// front so install/uninstall during a pending check does not affect it.
    pub async fn run(&self, call: &GuardCall<'_>) -> DbResult<()> {
        let guards: Vec<Arc<dyn Guard>> = self.tables.read().iter().filter_map(|t| t.get(call.op).cloned()).collect();
        for guard in guards {
            guard.check(call).await?;
        }
        Ok(())
    }
}
