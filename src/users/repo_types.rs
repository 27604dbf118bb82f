use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role, stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User record in the database.
///
/// The password hash and the reset-token bookkeeping never leave the server;
/// serialization skips them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing, default)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_reset_expires: Option<OffsetDateTime>,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    /// True when the password was changed at or after the token's issue time,
    /// which invalidates every token signed before the change.
    pub fn changed_password_after(&self, token_iat: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => changed_at.unix_timestamp() >= token_iat,
            None => false,
        }
    }
}

#[cfg(test)]
mod user_tests {
    use super::*;
    use time::Duration;

    fn sample_user(password_changed_at: Option<OffsetDateTime>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::User,
            password_changed_at,
            password_reset_token: Some("deadbeef".into()),
            password_reset_expires: Some(OffsetDateTime::now_utc()),
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn never_changed_password_is_never_stale() {
        let user = sample_user(None);
        assert!(!user.changed_password_after(0));
        assert!(!user.changed_password_after(i64::MAX));
    }

    #[test]
    fn change_before_issuance_keeps_token_valid() {
        let changed = OffsetDateTime::now_utc() - Duration::hours(1);
        let user = sample_user(Some(changed));
        let iat = changed.unix_timestamp() + 60;
        assert!(!user.changed_password_after(iat));
    }

    #[test]
    fn change_at_or_after_issuance_invalidates_token() {
        let changed = OffsetDateTime::now_utc();
        let user = sample_user(Some(changed));
        // exactly at issuance
        assert!(user.changed_password_after(changed.unix_timestamp()));
        // after issuance
        assert!(user.changed_password_after(changed.unix_timestamp() - 60));
    }

    #[test]
    fn secrets_never_serialize() {
        let user = sample_user(Some(OffsetDateTime::now_utc()));
        let value = serde_json::to_value(&user).expect("serialize user");
        let obj = value.as_object().expect("object");
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("password_reset_token"));
        assert!(!obj.contains_key("password_reset_expires"));
        assert_eq!(obj["email"], "ada@example.com");
        assert_eq!(obj["role"], "user");
    }
}
