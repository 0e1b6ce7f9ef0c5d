use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Role carried by server administrators. Bypasses every per-database check.
pub const SERVER_ADMIN_ROLE: &str = "_admin";

/// Identity used when a call carries no user context (admin party).
pub static ADMIN_PARTY: Lazy<UserCtx> = Lazy::new(|| UserCtx {
    name: None,
    roles: vec![SERVER_ADMIN_ROLE.to_string()],
});

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserCtx {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserCtx {
    pub fn new<S: Into<String>>(name: S, roles: &[&str]) -> Self {
        Self { name: Some(name.into()), roles: roles.iter().map(|r| r.to_string()).collect() }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_server_admin(&self) -> bool {
        self.has_role(SERVER_ADMIN_ROLE)
    }
}
