use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{restrict_to, CurrentUser},
        handlers::is_valid_email,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{ListQuery, UpdateMeRequest, UserDetailResponse, UserListResponse, UserResponse},
        repo_types::{Role, User},
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/update", patch(update_me))
        .route("/me/delete", delete(delete_me))
        .route("/list", get(list_users))
        .route("/:id", get(get_user))
}

#[instrument(skip(current))]
pub async fn get_me(current: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        status: "success",
        user: current.0,
    })
}

#[instrument(skip(state, current, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let CurrentUser(user) = current;

    if payload.password.is_some() || payload.password_confirm.is_some() {
        return Err(ApiError::bad_request(
            "This route is not for changing password. Please use /updatePassword",
        ));
    }

    let email = payload
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(ApiError::bad_request("Invalid email"));
        }
    }
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let updated = User::update_profile(&state.db, user.id, name, email.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("No user found with that ID"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(UserResponse {
        status: "success",
        user: updated,
    }))
}

#[instrument(skip(state, current))]
pub async fn delete_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, ApiError> {
    let CurrentUser(user) = current;
    User::deactivate(&state.db, user.id).await?;
    info!(user_id = %user.id, "account deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current))]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    restrict_to(&current.0, &[Role::Admin])?;

    let users = User::list(&state.db, query.sort.as_deref()).await?;
    Ok(Json(UserListResponse {
        status: "success",
        users,
    }))
}

#[instrument(skip(state, current))]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    restrict_to(&current.0, &[Role::Admin])?;

    // parsed by hand so a malformed id reaches the error boundary as a
    // descriptive 400 instead of a bare path rejection
    let id: Uuid = id.parse()?;
    let user = User::find_by_id(&state.db, id).await?.ok_or_else(|| {
        warn!(%id, "user lookup missed");
        ApiError::not_found("No user found with that ID")
    })?;

    Ok(Json(UserDetailResponse {
        status: "success",
        requested_at: OffsetDateTime::now_utc(),
        user,
    }))
}
