//! In-memory `Database` test double.
//!
//! Counts every invocation per method so tests can assert that a denied call
//! never reached the database, and can delay or fail local-document reads to
//! exercise the security fetch path.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::database::{Change, Database, Feed, ReplicationEvent};
use crate::error::{DbError, DbResult, PluginError};
use crate::identity::CallOptions;

#[derive(Default)]
pub struct MemoryDatabase {
    name: String,
    docs: Mutex<BTreeMap<String, Value>>,
    log: Mutex<Vec<Change>>,
    local: Mutex<HashMap<String, Value>>,
    attachments: Mutex<HashMap<(String, String), Vec<u8>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    local_reads: AtomicUsize,
    fail_local: AtomicBool,
    local_delay: Mutex<Option<Duration>>,
}

impl MemoryDatabase {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    fn hit(&self, method: &'static str) {
        *self.calls.lock().entry(method).or_insert(0) += 1;
    }

    /// Number of times `method` (client method name, e.g. `allDocs`) reached this database.
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().get(method).copied().unwrap_or(0)
    }

    pub fn local_reads(&self) -> usize {
        self.local_reads.load(Ordering::SeqCst)
    }

    pub fn fail_local_reads(&self, fail: bool) {
        self.fail_local.store(fail, Ordering::SeqCst);
    }

    pub fn delay_local_reads(&self, delay: Option<Duration>) {
        *self.local_delay.lock() = delay;
    }

    pub fn put_attachment(&self, doc_id: &str, attachment_id: &str, data: &[u8]) {
        self.attachments.lock().insert((doc_id.to_string(), attachment_id.to_string()), data.to_vec());
    }

    fn doc_rows(&self, options: &CallOptions) -> Vec<Value> {
        let include_docs = options.extra.get("include_docs").and_then(|v| v.as_bool()).unwrap_or(false);
        self.docs
            .lock()
            .iter()
            .map(|(id, doc)| {
                let mut row = json!({"id": id, "key": id, "value": {}});
                if include_docs {
                    row["doc"] = doc.clone();
                }
                row
            })
            .collect()
    }

    fn replication_feed(&self) -> Feed<ReplicationEvent> {
        let n = self.docs.lock().len() as u64;
        let events = vec![
            Ok(ReplicationEvent::Active),
            Ok(ReplicationEvent::Change { docs_read: n, docs_written: n }),
            Ok(ReplicationEvent::Complete { docs_read: n, docs_written: n }),
        ];
        stream::iter(events).boxed()
    }
}

fn missing() -> DbError {
    PluginError::not_found("missing").into()
}

#[async_trait]
impl Database for MemoryDatabase {
    fn name(&self) -> &str { &self.name }

    async fn info(&self) -> DbResult<Value> {
        self.hit("info");
        let doc_count = self.docs.lock().len();
        let update_seq = self.log.lock().len();
        Ok(json!({"db_name": self.name, "doc_count": doc_count, "update_seq": update_seq}))
    }

    async fn put(&self, doc: Value, _options: &CallOptions) -> DbResult<Value> {
        self.hit("put");
        let id = doc
            .get("_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| DbError::backend("bad_request", "document must have an _id"))?;
        let deleted = doc.get("_deleted").and_then(|v| v.as_bool()).unwrap_or(false);
        let seq = {
            let mut log = self.log.lock();
            let seq = log.len() as u64 + 1;
            log.push(Change { seq, id: id.clone(), deleted, doc: Some(doc.clone()) });
            seq
        };
        let mut docs = self.docs.lock();
        if deleted {
            docs.remove(&id);
        } else {
            docs.insert(id.clone(), doc);
        }
        Ok(json!({"ok": true, "id": id, "rev": format!("{}-mem", seq)}))
    }

    async fn all_docs(&self, options: &CallOptions) -> DbResult<Value> {
        self.hit("allDocs");
        let rows = self.doc_rows(options);
        Ok(json!({"total_rows": rows.len(), "offset": 0, "rows": rows}))
    }

    async fn query(&self, view: &str, options: &CallOptions) -> DbResult<Value> {
        self.hit("query");
        let rows = self.doc_rows(options);
        Ok(json!({"view": view, "total_rows": rows.len(), "offset": 0, "rows": rows}))
    }

    async fn get(&self, id: &str, _options: &CallOptions) -> DbResult<Value> {
        self.hit("get");
        self.docs.lock().get(id).cloned().ok_or_else(missing)
    }

    async fn get_attachment(&self, doc_id: &str, attachment_id: &str, _options: &CallOptions) -> DbResult<Vec<u8>> {
        self.hit("getAttachment");
        self.attachments
            .lock()
            .get(&(doc_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(missing)
    }

    async fn changes(&self, options: &CallOptions) -> DbResult<Feed<Change>> {
        self.hit("changes");
        let since = options.extra.get("since").and_then(|v| v.as_u64()).unwrap_or(0);
        let items: Vec<DbResult<Change>> = self.log.lock().iter().filter(|c| c.seq > since).cloned().map(Ok).collect();
        Ok(stream::iter(items).boxed())
    }

    async fn sync(&self, _remote: &str, _options: &CallOptions) -> DbResult<Feed<ReplicationEvent>> {
        self.hit("sync");
        Ok(self.replication_feed())
    }

    async fn replicate_from(&self, _source: &str, _options: &CallOptions) -> DbResult<Feed<ReplicationEvent>> {
        self.hit("replicate.from");
        Ok(self.replication_feed())
    }

    async fn replicate_to(&self, _target: &str, _options: &CallOptions) -> DbResult<Feed<ReplicationEvent>> {
        self.hit("replicate.to");
        Ok(self.replication_feed())
    }

    async fn get_local(&self, id: &str) -> DbResult<Option<Value>> {
        self.local_reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.local_delay.lock();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.fail_local.load(Ordering::SeqCst) {
            return Err(DbError::backend("unreachable", "local document store unavailable"));
        }
        Ok(self.local.lock().get(id).cloned())
    }

    async fn put_local(&self, id: &str, doc: Value) -> DbResult<()> {
        self.local.lock().insert(id.to_string(), doc);
        Ok(())
    }
}
