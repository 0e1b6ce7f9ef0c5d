//! Error model shared by the guard layer and the database collaborators.
//! `PluginError` is the structured payload callers see on an authorization
//! denial; `DbError` wraps it alongside failures coming from the database itself.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginError {
    pub status: u16,
    pub name: String,
    pub message: String,
}

impl PluginError {
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self { status: 401, name: "unauthorized".into(), message: message.into() }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self { status: 404, name: "not_found".into(), message: message.into() }
    }
}

impl Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for PluginError {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("security methods are not installed on database '{db}'")]
    SecurityNotInstalled { db: String },
    #[error("{code}: {message}")]
    Backend { code: String, message: String },
}

impl DbError {
    pub fn backend<S: Into<String>>(code: S, message: S) -> Self {
        DbError::Backend { code: code.into(), message: message.into() }
    }

    /// HTTP-style status for the error.
    pub fn status(&self) -> u16 {
        match self {
            DbError::Plugin(e) => e.status,
            DbError::SecurityNotInstalled { .. } => 500,
            DbError::Backend { .. } => 500,
        }
    }

    pub fn as_plugin(&self) -> Option<&PluginError> {
        match self {
            DbError::Plugin(e) => Some(e),
            _ => None,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(DbError::from(PluginError::unauthorized("no")).status(), 401);
        assert_eq!(DbError::from(PluginError::not_found("missing")).status(), 404);
        assert_eq!(DbError::SecurityNotInstalled { db: "x".into() }.status(), 500);
        assert_eq!(DbError::backend("io", "unreachable").status(), 500);
    }

    #[test]
    fn plugin_error_serializes_with_wire_field_names() {
        let v = serde_json::to_value(PluginError::not_found("missing")).unwrap();
        assert_eq!(v, serde_json::json!({"status": 404, "name": "not_found", "message": "missing"}));
    }

    #[test]
    fn display_is_transparent_for_plugin_errors() {
        let e = DbError::from(PluginError::unauthorized("Only admins"));
        assert_eq!(e.to_string(), "unauthorized: Only admins");
        assert_eq!(e.as_plugin().map(|p| p.status), Some(401));
        assert!(DbError::backend("io", "unreachable").as_plugin().is_none());
    }
}
