//! PostgreSQL-backed auth repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::repository::{RefreshTokenRepository, UserDirectory};
use crate::models::auth::{
    NewUser, RefreshTokenRecord, UserAccount, UserCredentials, UserId,
};

type RefreshTokenRow = (Uuid, i64, String, DateTime<Utc>, bool, DateTime<Utc>);
type UserRow = (i64, String, String, String, String);

fn refresh_from_row(row: RefreshTokenRow) -> RefreshTokenRecord {
    let (id, user_id, token_hash, expires_at, revoked, created_at) = row;
    RefreshTokenRecord {
        id,
        user_id,
        token_hash,
        expires_at,
        revoked,
        created_at,
    }
}

fn account_from_row(row: UserRow) -> Result<UserAccount, AuthError> {
    let (id, email, username, status, role) = row;
    Ok(UserAccount {
        id,
        email,
        username,
        status: status.parse().map_err(AuthError::Internal)?,
        role: role.parse().map_err(AuthError::Internal)?,
    })
}

/// `refresh_tokens` table access.
#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, revoked, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at \
             FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(refresh_from_row))
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_active_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE token_hash = $1 AND revoked = FALSE AND expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE \
             WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// `users` table access.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, status, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(account_from_row).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AuthError> {
        let row = sqlx::query_as::<_, (i64, String, String, String, String, String)>(
            "SELECT id, email, username, status, role, password_hash \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, email, username, status, role, password_hash)| {
            Ok(UserCredentials {
                account: account_from_row((id, email, username, status, role))?,
                password_hash,
            })
        })
        .transpose()
    }

    async fn create(&self, user: NewUser) -> Result<UserAccount, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email, username, status, role",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e
                && db.is_unique_violation()
            {
                let message = if db.constraint().is_some_and(|c| c.contains("email")) {
                    "Email already registered"
                } else {
                    "Username already taken"
                };
                return AuthError::Conflict(message.into());
            }
            AuthError::DbError(e)
        })?;
        account_from_row(row)
    }
}
