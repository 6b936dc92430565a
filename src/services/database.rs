use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use crate::models::{Session, User, UserRole};
use crate::services::AuthStore;

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password: Option<String>,
    provider: String,
    role: String,
    tos: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            provider: row.provider,
            role: UserRole::parse(&row.role),
            tos: row.tos,
        }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    refresh_token: Option<String>,
    provider: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            refresh_token: row.refresh_token,
            provider: row.provider,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Postgres-backed implementation of the persistence port.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, anyhow::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(PostgresStore { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        PostgresStore { pool }
    }
}

#[async_trait]
impl AuthStore for PostgresStore {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, anyhow::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password, provider, role, tos FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password, provider, role, tos FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create_user(&self, user: &User) -> Result<(), anyhow::Error> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password, provider, role, tos) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.provider)
        .bind(user.role.as_str())
        .bind(user.tos)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), anyhow::Error> {
        sqlx::query(
            "UPDATE users SET name = $2, email = $3, provider = $4, role = $5, tos = $6 \
             WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.provider)
        .bind(user.role.as_str())
        .bind(user.tos)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_user(&self, old_id: &str, user: &User) -> Result<(), anyhow::Error> {
        sqlx::query(
            "UPDATE users SET id = $2, name = $3, email = $4, provider = $5, role = $6, tos = $7 \
             WHERE id = $1",
        )
        .bind(old_id)
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.provider)
        .bind(user.role.as_str())
        .bind(user.tos)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_user_password(&self, id: &str, hash: &str) -> Result<(), anyhow::Error> {
        sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), anyhow::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, refresh_token, provider, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.refresh_token)
        .bind(&session.provider)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, anyhow::Error> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, refresh_token, provider, created_at, expires_at \
             FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    async fn update_session(&self, session: &Session) -> Result<(), anyhow::Error> {
        sqlx::query("UPDATE sessions SET refresh_token = $2, expires_at = $3 WHERE id = $1")
            .bind(&session.id)
            .bind(&session.refresh_token)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), anyhow::Error> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> Result<u64, anyhow::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
