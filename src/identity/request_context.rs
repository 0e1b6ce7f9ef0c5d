use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::principal::{UserCtx, ADMIN_PARTY};

/// Per-call options bag. Only `userCtx` is interpreted here; every other key
/// is kept in `extra` and handed to the underlying operation as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallOptions {
    #[serde(rename = "userCtx", default, skip_serializing_if = "Option::is_none")]
    pub user_ctx: Option<UserCtx>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallOptions {
    pub fn as_user(user_ctx: UserCtx) -> Self {
        Self { user_ctx: Some(user_ctx), extra: Map::new() }
    }

    pub fn with<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Caller identity, falling back to the admin-party sentinel.
    pub fn effective_user(&self) -> &UserCtx {
        self.user_ctx.as_ref().unwrap_or(&ADMIN_PARTY)
    }
}
