//! Role lookups with not-found semantics.

use super::error::{AuthError, StoreResultExt};
use crate::db::{Database, Role, StoredRole};

#[derive(Clone)]
pub struct RoleResolver {
    db: Database,
}

impl RoleResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Roles held by an account, in assignment order.
    pub async fn roles_of(&self, account_id: &str) -> Result<Vec<Role>, AuthError> {
        let exists = self
            .db
            .users()
            .exists(account_id)
            .await
            .store_err("Failed to look up user")?;

        if !exists {
            return Err(AuthError::NotFound("User with this id not exist!".into()));
        }

        self.db
            .roles()
            .roles_of(account_id)
            .await
            .store_err("Failed to load roles")
    }

    pub async fn by_name(&self, name: Role) -> Result<StoredRole, AuthError> {
        self.db
            .roles()
            .get_by_name(name)
            .await
            .store_err("Failed to look up role")?
            .ok_or_else(|| AuthError::NotFound("Role not exist!".into()))
    }

    pub async fn has_role(&self, account_id: &str, name: Role) -> Result<bool, AuthError> {
        Ok(self.roles_of(account_id).await?.contains(&name))
    }
}
