use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::map_db_error;
use crate::{NewUser, Result, Role, StoreError, UserId, UserPatch, UserRecord, UserStore};

const USER_COLUMNS: &str = "id, name, email, password_hash, roles, tokens, created_at";

/// PostgreSQL-backed user store.
///
/// Session tokens live in a `TEXT[]` column and are changed with single
/// `array_append` / `array_remove` statements.
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Creates a new PostgreSQL user store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: PgRow) -> Result<UserRecord> {
        let roles: Vec<String> = row.try_get("roles")?;
        let roles = roles
            .iter()
            .map(|r| r.parse::<Role>().map_err(StoreError::InvalidRecord))
            .collect::<Result<Vec<_>>>()?;

        Ok(UserRecord {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            roles,
            tokens: row.try_get("tokens")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}"))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn execute_for_user(&self, sql: &str, id: UserId, token: Option<&str>) -> Result<bool> {
        let mut query = sqlx::query(sql).bind(id.as_uuid());
        if let Some(token) = token {
            query = query.bind(token);
        }
        let result = query.execute(&self.pool).await.map_err(map_db_error)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let roles: Vec<String> = user.roles.iter().map(|r| r.as_str().to_string()).collect();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, roles)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(roles)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::row_to_user(row)
    }

    async fn get(&self, id: UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.fetch_one_where("email = $1", email).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>> {
        self.fetch_one_where("$1 = ANY(tokens)", token).await
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                password_hash = COALESCE($3, password_hash)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.name)
        .bind(patch.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Self::row_to_user).transpose()
    }

    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Self::row_to_user).transpose()
    }

    async fn add_token(&self, id: UserId, token: String) -> Result<bool> {
        self.execute_for_user(
            "UPDATE users SET tokens = array_append(tokens, $2) WHERE id = $1",
            id,
            Some(&token),
        )
        .await
    }

    async fn remove_token(&self, id: UserId, token: &str) -> Result<bool> {
        self.execute_for_user(
            "UPDATE users SET tokens = array_remove(tokens, $2) WHERE id = $1",
            id,
            Some(token),
        )
        .await
    }

    async fn clear_tokens(&self, id: UserId) -> Result<bool> {
        self.execute_for_user("UPDATE users SET tokens = '{}' WHERE id = $1", id, None)
            .await
    }
}
