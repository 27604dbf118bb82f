use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::User;

// Soft-deleted accounts are invisible to every lookup, so a deactivated user
// can neither log in nor resolve from an old token.

impl User {
    /// Find an active user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, active, created_at
            FROM users
            WHERE email = $1 AND active
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Find an active user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, active, created_at
            FROM users
            WHERE id = $1 AND active
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Resolve a user from a reset-token hash; only matches while the token
    /// is unexpired.
    pub async fn find_by_reset_token(
        db: &PgPool,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, active, created_at
            FROM users
            WHERE password_reset_token = $1
              AND password_reset_expires > NOW()
              AND active
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await
    }

    /// Create a new user with a hashed password. Duplicate emails surface as
    /// a unique violation.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token, password_reset_expires, active, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Store a new password and clear any pending reset token.
    ///
    /// `password_changed_at` is backdated one second so a token minted in the
    /// same request is not immediately stale.
    pub async fn update_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = NOW() - INTERVAL '1 second',
                password_reset_token = NULL,
                password_reset_expires = NULL
            WHERE id = $1 AND active
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token, password_reset_expires, active, created_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Partial save for reset bookkeeping: records the token hash and its
    /// expiry without touching anything else.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        ttl_minutes: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2,
                password_reset_expires = NOW() + make_interval(mins => $3::int)
            WHERE id = $1 AND active
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(ttl_minutes)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Roll back a just-issued reset token, e.g. after a failed mail send.
    pub async fn clear_reset_token(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = NULL,
                password_reset_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Apply a profile update; only name and email are mutable here.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email)
            WHERE id = $1 AND active
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token, password_reset_expires, active, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Soft delete: the record persists but disappears from every lookup.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// List all active users with a whitelisted sort key.
    pub async fn list(db: &PgPool, sort: Option<&str>) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, active, created_at
            FROM users
            WHERE active
            ORDER BY {}
            "#,
            order_clause(sort)
        );
        sqlx::query_as::<_, User>(&query).fetch_all(db).await
    }

}

// Sort keys are interpolated into SQL, so anything outside the whitelist
// falls back to the default.
fn order_clause(sort: Option<&str>) -> &'static str {
    match sort {
        Some("email") => "email ASC",
        Some("-email") => "email DESC",
        Some("created_at") => "created_at ASC",
        Some("-created_at") => "created_at DESC",
        Some("-name") => "name DESC",
        _ => "name ASC",
    }
}
