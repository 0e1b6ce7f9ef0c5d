//! Protection settings: which databases count as system databases and where
//! their security document lives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::security::DEFAULT_SECURITY_DOC_ID;

fn default_security_doc_id() -> String { DEFAULT_SECURITY_DOC_ID.to_string() }

fn default_system_databases() -> Vec<String> { vec!["_users".to_string(), "_replicator".to_string()] }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtectionConfig {
    #[serde(default = "default_security_doc_id")]
    pub security_doc_id: String,
    #[serde(default = "default_system_databases")]
    pub system_databases: Vec<String>,
    /// Treat every database whose name starts with `_` as a system database.
    #[serde(default)]
    pub underscore_prefix_is_system: bool,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            security_doc_id: default_security_doc_id(),
            system_databases: default_system_databases(),
            underscore_prefix_is_system: false,
        }
    }
}

impl ProtectionConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: ProtectionConfig = serde_json::from_str(s).context("parse protection config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read protection config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.security_doc_id.trim().is_empty() {
            anyhow::bail!("security_doc_id must not be empty");
        }
        Ok(())
    }

    pub fn is_system_database(&self, name: &str) -> bool {
        if self.underscore_prefix_is_system && name.starts_with('_') {
            return true;
        }
        self.system_databases.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_fields_missing() {
        let cfg = ProtectionConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, ProtectionConfig::default());
        assert_eq!(cfg.security_doc_id, "_local/_security");
        assert!(cfg.is_system_database("_users"));
        assert!(cfg.is_system_database("_replicator"));
        assert!(!cfg.is_system_database("_global_changes"));
        assert!(!cfg.is_system_database("notes"));
    }

    #[test]
    fn underscore_prefix_flag() {
        let cfg = ProtectionConfig::from_json_str(r#"{"underscore_prefix_is_system": true, "system_databases": []}"#).unwrap();
        assert!(cfg.is_system_database("_global_changes"));
        assert!(!cfg.is_system_database("notes"));
    }

    #[test]
    fn rejects_empty_doc_id_and_bad_json() {
        assert!(ProtectionConfig::from_json_str(r#"{"security_doc_id": "  "}"#).is_err());
        assert!(ProtectionConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protect.json");
        std::fs::write(&path, r#"{"system_databases": ["_users", "audit"]}"#).unwrap();
        let cfg = ProtectionConfig::from_json_file(&path).unwrap();
        assert!(cfg.is_system_database("audit"));
        assert!(!cfg.is_system_database("_replicator"));
        assert!(ProtectionConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
