//! SurrealDB implementation of [`RoleRepository`].
//!
//! Roles are seeded by the migration runner and read-only at runtime.

use fintrack_core::error::FintrackResult;
use fintrack_core::models::role::Role;
use fintrack_core::repository::RoleRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct RoleRow {
    name: String,
}

#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn get_by_name(&self, name: &str) -> FintrackResult<Role> {
        let mut result = self
            .db
            .query("SELECT name FROM role WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: name.to_string(),
        })?;

        Ok(Role { name: row.name })
    }
}
