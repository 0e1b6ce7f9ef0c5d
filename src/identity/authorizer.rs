use crate::security::SecurityDoc;

use super::principal::{UserCtx, ADMIN_PARTY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(self) -> bool { self == Decision::Allow }
}

/// True when the user is named in the database's admin users or shares a role
/// with its admin roles.
pub fn is_db_admin(user: &UserCtx, security: &SecurityDoc) -> bool {
    let admins = &security.admins;
    let by_name = match user.name.as_deref() {
        Some(name) => admins.users.iter().any(|u| u == name),
        None => false,
    };
    by_name || admins.roles.iter().any(|role| user.has_role(role))
}

/// Admin-only gate. Pure function of its inputs; an absent user is the admin party.
pub fn authorize(user: Option<&UserCtx>, security: &SecurityDoc) -> Decision {
    let user = user.unwrap_or(&ADMIN_PARTY);
    if user.is_server_admin() {
        return Decision::Allow;
    }
    if is_db_admin(user, security) { Decision::Allow } else { Decision::Deny }
}
