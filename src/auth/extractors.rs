use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::{
    auth::jwt::JwtKeys,
    error::ApiError,
    state::AppState,
    users::repo_types::{Role, User},
};

pub const SESSION_COOKIE: &str = "jwt";

/// Authenticated-user extractor. Runs the full login gate and attaches the
/// resolved user to the handler.
///
/// Check order is load-bearing: missing token, then signature/expiry, then
/// user lookup, then password staleness.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or_else(|| {
                ApiError::unauthorized("You are not logged in. Please log in for access")
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::from(e)
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for missing user");
                ApiError::unauthorized("The user belonging to this token no longer exists")
            })?;

        if user.changed_password_after(claims.iat as i64) {
            warn!(user_id = %user.id, "token predates password change");
            return Err(ApiError::unauthorized(
                "This user recently changed their password. Please log in again.",
            ));
        }

        Ok(CurrentUser(user))
    }
}

/// Candidate token from the `Authorization: Bearer …` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Candidate token from the session cookie.
fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// Role gate, checked only after authentication succeeds. Pure function of
/// the allowed set and the user's role.
pub fn restrict_to(user: &User, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        ))
    }
}

#[cfg(test)]
mod token_source_tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(
                axum::http::header::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn bearer_header_is_extracted() {
        let map = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(bearer_token(&map).as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_token(&map), None);
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let map = headers(&[("authorization", "Basic dXNlcjpwdw==")]);
        assert_eq!(bearer_token(&map), None);
    }

    #[test]
    fn session_cookie_is_extracted() {
        let map = headers(&[("cookie", "jwt=tok123; other=x")]);
        assert_eq!(cookie_token(&map).as_deref(), Some("tok123"));
    }

    #[test]
    fn header_wins_over_cookie() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "jwt=from-cookie"),
        ]);
        let token = bearer_token(&map).or_else(|| cookie_token(&map));
        assert_eq!(token.as_deref(), Some("from-header"));
    }

    #[test]
    fn absent_sources_yield_nothing() {
        let map = headers(&[]);
        assert_eq!(bearer_token(&map).or_else(|| cookie_token(&map)), None);
    }
}

#[cfg(test)]
mod role_gate_tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user_with_role(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            role,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn allowed_role_passes() {
        let admin = user_with_role(Role::Admin);
        assert!(restrict_to(&admin, &[Role::Admin]).is_ok());
        assert!(restrict_to(&admin, &[Role::User, Role::Admin]).is_ok());
    }

    #[test]
    fn disallowed_role_is_forbidden() {
        let user = user_with_role(Role::User);
        let err = restrict_to(&user, &[Role::Admin]).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(
            err.to_string(),
            "You do not have permission to perform this action"
        );
    }
}
