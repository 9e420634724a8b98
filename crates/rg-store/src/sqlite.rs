//! SQLite association store
//!
//! One row per (owner, role). The `UNIQUE(owner_id, role)` constraint is what
//! serializes concurrent adds: the losing insert fails with a unique violation
//! and is reported as `DuplicateRole`. Removes are a single `DELETE`, and zero
//! affected rows means the association was already gone.

use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rg_common::{PrincipalId, RoleIdentifier};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::{AssociationStore, Result, RoleAssociation, StoreError};

pub struct SqliteAssociationStore<R> {
    pool: SqlitePool,
    query_timeout: Duration,
    _role: PhantomData<fn() -> R>,
}

impl<R: RoleIdentifier> SqliteAssociationStore<R> {
    pub fn new(pool: SqlitePool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
            _role: PhantomData,
        }
    }

    /// Open a pool for `url` (creating the database file if needed)
    pub async fn connect(url: &str, max_connections: u32, query_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(query_timeout)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool, query_timeout))
    }

    /// Create the association table
    pub async fn init_schema(&self) -> Result<()> {
        self.timed(
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS role_associations (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE(owner_id, role)
                )
                "#,
            )
            .execute(&self.pool),
        )
        .await??;

        info!("SQLite role association schema initialized");
        Ok(())
    }

    /// Run a query under the store's timeout. The outer error is the timeout,
    /// the inner one is whatever the database reported.
    async fn timed<T, F>(&self, query: F) -> Result<std::result::Result<T, sqlx::Error>>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| {
                warn!(timeout = ?self.query_timeout, "SQLite role query timed out");
                StoreError::Timeout(self.query_timeout)
            })
    }

    fn parse_row(row: &SqliteRow) -> Result<RoleAssociation<R>> {
        let role: String = row.try_get("role")?;
        let owner_id: String = row.try_get("owner_id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(RoleAssociation {
            id: row.try_get("id")?,
            role: R::decode(&role)?,
            owner_id: PrincipalId::new(owner_id),
            created_at,
        })
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[async_trait]
impl<R: RoleIdentifier> AssociationStore<R> for SqliteAssociationStore<R> {
    async fn has(&self, owner: &PrincipalId, role: &R) -> Result<bool> {
        let row = self
            .timed(
                sqlx::query(
                    "SELECT EXISTS(SELECT 1 FROM role_associations WHERE owner_id = ? AND role = ?) AS present",
                )
                .bind(owner.as_str())
                .bind(role.as_str())
                .fetch_one(&self.pool),
            )
            .await??;

        let present: i64 = row.try_get("present")?;
        Ok(present != 0)
    }

    async fn has_any(&self, owner: &PrincipalId, roles: &HashSet<R>) -> Result<bool> {
        if roles.is_empty() {
            return Ok(false);
        }

        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM role_associations WHERE owner_id = ? AND role IN ({})) AS present",
            placeholders(roles.len())
        );
        let mut query = sqlx::query(&sql).bind(owner.as_str());
        for role in roles {
            query = query.bind(role.as_str());
        }

        let row = self.timed(query.fetch_one(&self.pool)).await??;
        let present: i64 = row.try_get("present")?;
        Ok(present != 0)
    }

    async fn add(&self, owner: &PrincipalId, role: &R) -> Result<RoleAssociation<R>> {
        let association = RoleAssociation::persisted(*role, owner.clone());

        let inserted = self
            .timed(
                sqlx::query(
                    "INSERT INTO role_associations (id, owner_id, role, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(association.id.as_deref())
                .bind(owner.as_str())
                .bind(role.as_str())
                .bind(association.created_at)
                .execute(&self.pool),
            )
            .await?;

        match inserted {
            Ok(_) => {
                debug!(principal_id = %owner, role = role.as_str(), "Role association inserted");
                Ok(association)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(principal_id = %owner, role = role.as_str(), "Duplicate role association rejected");
                Err(StoreError::duplicate_role(owner, role))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, owner: &PrincipalId, role: &R) -> Result<()> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM role_associations WHERE owner_id = ? AND role = ?")
                    .bind(owner.as_str())
                    .bind(role.as_str())
                    .execute(&self.pool),
            )
            .await??;

        if result.rows_affected() == 0 {
            return Err(StoreError::role_not_found(owner, role));
        }

        debug!(principal_id = %owner, role = role.as_str(), "Role association deleted");
        Ok(())
    }

    async fn list(&self, owner: &PrincipalId) -> Result<Vec<RoleAssociation<R>>> {
        let rows = self
            .timed(
                sqlx::query(
                    r#"
                    SELECT id, owner_id, role, created_at
                    FROM role_associations
                    WHERE owner_id = ?
                    ORDER BY created_at, role
                    "#,
                )
                .bind(owner.as_str())
                .fetch_all(&self.pool),
            )
            .await??;

        rows.iter().map(Self::parse_row).collect()
    }
}
