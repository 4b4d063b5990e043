use std::fmt;
use std::str::FromStr;

use sqlx::sqlite::SqlitePool;

/// Role names. The set is closed and seeded by the first migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Editor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "Viewer",
            Role::Editor => "Editor",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Viewer" => Ok(Role::Viewer),
            "Editor" => Ok(Role::Editor),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A role row as stored in the roles table.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRole {
    pub id: String,
    pub name: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<RoleRow> for StoredRole {
    type Error = sqlx::Error;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let name = row
            .name
            .parse()
            .map_err(|e: UnknownRole| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Self {
            id: row.id,
            name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct RoleStore {
    pool: SqlitePool,
}

impl RoleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a role by its ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<StoredRole>, sqlx::Error> {
        let row: Option<RoleRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM roles WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(StoredRole::try_from).transpose()
    }

    /// Get a role by its name.
    pub async fn get_by_name(&self, name: Role) -> Result<Option<StoredRole>, sqlx::Error> {
        let row: Option<RoleRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM roles WHERE name = ?")
                .bind(name.as_str())
                .fetch_optional(&self.pool)
                .await?;
        row.map(StoredRole::try_from).transpose()
    }

    pub async fn list(&self) -> Result<Vec<StoredRole>, sqlx::Error> {
        let rows: Vec<RoleRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM roles ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(StoredRole::try_from).collect()
    }

    /// Roles assigned to a user, in assignment order.
    /// Returns an empty list for unknown users; callers check existence separately.
    pub async fn roles_of(&self, user_id: &str) -> Result<Vec<Role>, sqlx::Error> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT r.name FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ?
             ORDER BY ur.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names
            .into_iter()
            .filter_map(|(name,)| name.parse().ok())
            .collect())
    }
}
