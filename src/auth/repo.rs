use crate::auth::repo_types::User;
use crate::error::ApiError;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = "user_id, email, password_hash, role, last_issued_token, \
     reset_token, reset_token_expires, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by reset token. Only matches while the stored expiry is
    /// strictly in the future.
    pub async fn find_by_reset_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token = $1 AND reset_token_expires > now()"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password. A duplicate email surfaces
    /// as `ApiError::Conflict` even if it races past the handler's
    /// pre-check.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, ApiError> {
        let res = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(ApiError::Conflict("Email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Record the latest issued access token.
    pub async fn set_last_issued_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET last_issued_token = $2, updated_at = now() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(token)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store a fresh reset token with its expiry.
    pub async fn set_reset_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires = $3, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Complete a password reset: new hash, reset fields cleared, and the
    /// outstanding access token dropped so the reset token is single-use.
    pub async fn reset_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_token = NULL, \
             reset_token_expires = NULL, last_issued_token = NULL, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Authenticated password change: new hash, outstanding token dropped.
    pub async fn change_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, last_issued_token = NULL, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}
