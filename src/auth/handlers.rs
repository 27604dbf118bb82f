use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use time::Duration as TimeDuration;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            ResetPasswordRequest, SignupRequest, UpdatePasswordRequest,
        },
        extractors::{CurrentUser, SESSION_COOKIE},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        reset,
    },
    error::ApiError,
    mail,
    state::AppState,
    users::repo_types::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgotPassword", post(forgot_password))
        .route("/resetPassword/:token", patch(reset_password))
        .route("/updatePassword", patch(update_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_new_password(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if password != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    Ok(())
}

/// Issue a token, set the session cookie and build the success payload.
/// Mirrors every place a credential change logs the user straight in.
fn create_and_send_token(
    state: &AppState,
    jar: CookieJar,
    user: &User,
    status: StatusCode,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id).map_err(ApiError::from)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .max_age(TimeDuration::seconds(state.config.jwt.cookie_ttl_seconds))
        .secure(state.config.env.is_production())
        .build();

    Ok((
        status,
        jar.add(cookie),
        Json(AuthResponse {
            status: "success",
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid signup email");
        return Err(ApiError::bad_request("Invalid email"));
    }
    validate_new_password(&payload.password, &payload.password_confirm)?;

    let hash = hash_password(&payload.password)?;
    // a duplicate email surfaces as a unique violation and is remapped at the
    // error boundary
    let user = User::create(&state.db, name, &payload.email, &hash).await?;

    let url = format!("{}/myProfile", state.config.client_site);
    let mail = mail::welcome(&user.name, &user.email, &url, &state.config.mail.site_title);
    state.mailer.send(mail).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    create_and_send_token(&state, jar, &user, StatusCode::CREATED)
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password required"));
    }

    let user = User::find_by_email(&state.db, &email).await?;
    let authenticated = match &user {
        Some(user) => verify_password(&password, &user.password_hash)?,
        None => false,
    };
    let Some(user) = user.filter(|_| authenticated) else {
        warn!(email = %email, "login rejected");
        return Err(ApiError::unauthorized("Incorrect email or password"));
    };

    info!(user_id = %user.id, email = %user.email, "user logged in");
    create_and_send_token(&state, jar, &user, StatusCode::OK)
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    // overwrite the session cookie with a short-lived throwaway value
    let cookie = Cookie::build((SESSION_COOKIE, "logged_out"))
        .path("/")
        .http_only(true)
        .max_age(TimeDuration::seconds(10))
        .build();
    (jar.add(cookie), Json(json!({ "status": "success" })))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("No user found with that email"))?;

    let token = reset::issue();
    User::set_reset_token(&state.db, user.id, &token.hashed, state.config.reset_ttl_minutes)
        .await?;

    let reset_url = format!("{}/reset-password/{}", state.config.client_site, token.plain);
    let mail = mail::password_reset(
        &user.name,
        &user.email,
        &reset_url,
        &state.config.mail.site_title,
    );
    if let Err(e) = state.mailer.send(mail).await {
        error!(error = %e, user_id = %user.id, "reset mail failed");
        // the emailed link never went out, so the token must not stay live
        User::clear_reset_token(&state.db, user.id).await?;
        return Err(ApiError::internal(
            "There was an error sending the email. Try again later",
        ));
    }

    info!(user_id = %user.id, "password reset token sent");
    Ok(Json(MessageResponse {
        status: "success",
        message: "Password reset token sent to email".into(),
    }))
}

// the plain token must stay out of the span fields
#[instrument(skip(state, jar, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    // the link carries the plain value; only its hash was persisted
    let hashed = reset::hash_token(&token);
    let user = User::find_by_reset_token(&state.db, &hashed)
        .await?
        .ok_or_else(|| ApiError::bad_request("token is invalid or expired"))?;

    validate_new_password(&payload.password, &payload.password_confirm)?;
    let hash = hash_password(&payload.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset");
    create_and_send_token(&state, jar, &user, StatusCode::OK)
}

#[instrument(skip(state, jar, current, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    jar: CookieJar,
    current: CurrentUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let CurrentUser(user) = current;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "wrong current password");
        return Err(ApiError::unauthorized(
            "Incorrect password provided. Please try again",
        ));
    }

    validate_new_password(&payload.password, &payload.password_confirm)?;
    let hash = hash_password(&payload.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password updated");
    create_and_send_token(&state, jar, &user, StatusCode::OK)
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn short_password_is_rejected() {
        let err = validate_new_password("short", "short").unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let err = validate_new_password("long-enough", "different").unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[test]
    fn matching_pair_passes() {
        assert!(validate_new_password("long-enough", "long-enough").is_ok());
    }
}
