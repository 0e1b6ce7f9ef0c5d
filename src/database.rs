//! Interface of the hosting database client. The guard layer consumes this
//! trait and implements it again on `DatabaseHandle`, so a protected handle can
//! stand in wherever a plain database is expected.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DbResult;
use crate::identity::CallOptions;

/// Long-lived result of a streaming operation. Dropping it cancels the stream.
pub type Feed<T> = BoxStream<'static, DbResult<T>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Change {
    pub seq: u64,
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplicationEvent {
    Active,
    Change { docs_read: u64, docs_written: u64 },
    Complete { docs_read: u64, docs_written: u64 },
}

#[async_trait]
pub trait Database: Send + Sync {
    fn name(&self) -> &str;

    async fn info(&self) -> DbResult<Value>;
    async fn put(&self, doc: Value, options: &CallOptions) -> DbResult<Value>;

    async fn all_docs(&self, options: &CallOptions) -> DbResult<Value>;
    async fn query(&self, view: &str, options: &CallOptions) -> DbResult<Value>;
    async fn get(&self, id: &str, options: &CallOptions) -> DbResult<Value>;
    async fn get_attachment(&self, doc_id: &str, attachment_id: &str, options: &CallOptions) -> DbResult<Vec<u8>>;

    async fn changes(&self, options: &CallOptions) -> DbResult<Feed<Change>>;
    async fn sync(&self, remote: &str, options: &CallOptions) -> DbResult<Feed<ReplicationEvent>>;
    async fn replicate_from(&self, source: &str, options: &CallOptions) -> DbResult<Feed<ReplicationEvent>>;
    async fn replicate_to(&self, target: &str, options: &CallOptions) -> DbResult<Feed<ReplicationEvent>>;

    /// Local documents are never replicated and never guarded.
    async fn get_local(&self, id: &str) -> DbResult<Option<Value>>;
    async fn put_local(&self, id: &str, doc: Value) -> DbResult<()>;
}
