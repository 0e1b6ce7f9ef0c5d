//! Per-database security document and the capability that reads/writes it.
//!
//! The document lives as a local (non-replicated) document of the database it
//! protects. Reads are never cached: every `get_security` goes back to the
//! database, so edits to the admin lists apply on the very next call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::database::Database;
use crate::error::{DbError, DbResult};

pub const DEFAULT_SECURITY_DOC_ID: &str = "_local/_security";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessList {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AccessList {
    fn from_value(v: Option<&Value>) -> Self {
        Self { users: string_list(v.and_then(|o| o.get("users"))), roles: string_list(v.and_then(|o| o.get("roles"))) }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityDoc {
    #[serde(default)]
    pub admins: AccessList,
    #[serde(default)]
    pub members: AccessList,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Keep only string entries; anything else in a list position reads as empty.
fn string_list(v: Option<&Value>) -> Vec<String> {
    match v.and_then(|v| v.as_array()) {
        Some(arr) => arr.iter().filter_map(|e| e.as_str().map(str::to_string)).collect(),
        None => Vec::new(),
    }
}

impl SecurityDoc {
    /// Lenient decode. Malformed or missing sections read as empty lists.
    pub fn from_value(v: &Value) -> Self {
        let admins = AccessList::from_value(v.get("admins").filter(|a| a.is_object()));
        let members = AccessList::from_value(v.get("members").filter(|m| m.is_object()));
        let mut extra = Map::new();
        if let Some(obj) = v.as_object() {
            for (k, val) in obj.iter() {
                if k != "admins" && k != "members" && !k.starts_with('_') {
                    extra.insert(k.clone(), val.clone());
                }
            }
        }
        Self { admins, members, extra }
    }

    pub fn to_value(&self) -> DbResult<Value> {
        serde_json::to_value(self).map_err(|e| DbError::backend("serialize".to_string(), e.to_string()))
    }
}

/// Security-document capability attached to a database handle.
#[async_trait]
pub trait SecurityStore: Send + Sync {
    async fn get_security(&self) -> DbResult<SecurityDoc>;
    async fn put_security(&self, doc: &SecurityDoc) -> DbResult<()>;
}

/// Stores the security document as a local document of the protected database.
pub struct LocalDocSecurity {
    db: Arc<dyn Database>,
    doc_id: String,
}

impl LocalDocSecurity {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::with_doc_id(db, DEFAULT_SECURITY_DOC_ID)
    }

    pub fn with_doc_id<S: Into<String>>(db: Arc<dyn Database>, doc_id: S) -> Self {
        Self { db, doc_id: doc_id.into() }
    }

    pub fn doc_id(&self) -> &str { &self.doc_id }
}

#[async_trait]
impl SecurityStore for LocalDocSecurity {
    async fn get_security(&self) -> DbResult<SecurityDoc> {
        let doc = self.db.get_local(&self.doc_id).await?;
        Ok(doc.as_ref().map(SecurityDoc::from_value).unwrap_or_default())
    }

    async fn put_security(&self, doc: &SecurityDoc) -> DbResult<()> {
        self.db.put_local(&self.doc_id, doc.to_value()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDatabase;
    use serde_json::json;

    #[test]
    fn decode_tolerates_missing_and_malformed_sections() {
        assert_eq!(SecurityDoc::from_value(&json!({})), SecurityDoc::default());
        assert_eq!(SecurityDoc::from_value(&json!(null)), SecurityDoc::default());
        let d = SecurityDoc::from_value(&json!({"admins": "nope", "members": {"users": 3}}));
        assert!(d.admins.users.is_empty() && d.admins.roles.is_empty());
        assert!(d.members.users.is_empty());
        let d = SecurityDoc::from_value(&json!({"admins": {"users": ["alice", 7, null], "roles": "x"}}));
        assert_eq!(d.admins.users, vec!["alice".to_string()]);
        assert!(d.admins.roles.is_empty());
    }

    #[test]
    fn decode_keeps_unknown_fields_but_drops_doc_metadata() {
        let d = SecurityDoc::from_value(&json!({"_id": "_local/_security", "_rev": "0-1", "owner": "ops"}));
        assert_eq!(d.extra.get("owner"), Some(&json!("ops")));
        assert!(!d.extra.contains_key("_id"));
        assert!(!d.extra.contains_key("_rev"));
    }

    #[test]
    fn encoded_document_decodes_to_the_same_lists() {
        let mut doc = SecurityDoc::default();
        doc.admins.users.push("alice".into());
        doc.members.roles.push("readers".into());
        doc.extra.insert("owner".into(), json!("ops"));
        let v = doc.to_value().unwrap();
        assert_eq!(v["admins"]["users"], json!(["alice"]));
        assert_eq!(SecurityDoc::from_value(&v), doc);
    }

    #[tokio::test]
    async fn absent_document_reads_as_empty() {
        let db = Arc::new(MemoryDatabase::new("_users"));
        let store = LocalDocSecurity::new(db);
        assert_eq!(store.get_security().await.unwrap(), SecurityDoc::default());
    }

    #[tokio::test]
    async fn put_then_get_reads_fresh_each_time() {
        let db = Arc::new(MemoryDatabase::new("_users"));
        let store = LocalDocSecurity::new(db.clone());
        let mut doc = SecurityDoc::default();
        doc.admins.users.push("alice".into());
        store.put_security(&doc).await.unwrap();
        assert_eq!(store.get_security().await.unwrap(), doc);
        doc.admins.roles.push("editors".into());
        store.put_security(&doc).await.unwrap();
        assert_eq!(store.get_security().await.unwrap().admins.roles, vec!["editors".to_string()]);
        assert_eq!(db.local_reads(), 2);
    }

    #[tokio::test]
    async fn custom_doc_id_is_used() {
        let db = Arc::new(MemoryDatabase::new("_replicator"));
        db.put_local("_local/acl", json!({"admins": {"users": ["ops"]}})).await.unwrap();
        let store = LocalDocSecurity::with_doc_id(db, "_local/acl");
        assert_eq!(store.doc_id(), "_local/acl");
        assert_eq!(store.get_security().await.unwrap().admins.users, vec!["ops".to_string()]);
    }

    #[tokio::test]
    async fn read_failures_propagate() {
        let db = Arc::new(MemoryDatabase::new("_users"));
        db.fail_local_reads(true);
        let store = LocalDocSecurity::new(db);
        let err = store.get_security().await.unwrap_err();
        assert_eq!(err, DbError::backend("unreachable", "local document store unavailable"));
    }
}
