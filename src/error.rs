use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::{config::EnvMode, state::AppState};

/// Failure raised anywhere in request handling.
///
/// `Operational` failures are raised on purpose by handler code and carry a
/// client-safe message and status. Everything else is an `Unexpected` defect:
/// its detail is shown to the client in development only and is otherwise
/// confined to the server log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Operational { status: StatusCode, message: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    pub fn operational(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Operational {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, message)
    }

    /// Operational 500: the failure is understood and the message is safe to
    /// show even in production.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, ApiError::Operational { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Operational { status, .. } => *status,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }
}

/// Known persistence-layer failure shapes are remapped here so handlers can
/// use `?` on repo calls and still produce descriptive client errors.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let field = db.constraint().unwrap_or("value");
                ApiError::bad_request(format!(
                    "Duplicate field value: {field}. Please use another value"
                ))
            }
            sqlx::Error::RowNotFound => ApiError::not_found("Requested record was not found"),
            _ => ApiError::Unexpected(err.into()),
        }
    }
}

/// Token codec failures raised outside the authentication gate funnel through
/// here as well.
impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::unauthorized("Login token expired. Please log in again")
            }
            _ => ApiError::unauthorized("Invalid login token. Please log in again"),
        }
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::bad_request(format!("Invalid identifier: {err}"))
    }
}

impl IntoResponse for ApiError {
    /// Emits a bare response carrying the error in its extensions; the
    /// `normalize` layer at the boundary renders the actual body.
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::empty());
        *res.status_mut() = self.status_code();
        res.extensions_mut().insert(Arc::new(self));
        res
    }
}

/// Shape the client-facing body for a failure.
pub fn render(err: &ApiError, mode: EnvMode) -> (StatusCode, Value) {
    let status = err.status_code();
    match mode {
        EnvMode::Development => (
            status,
            json!({
                "status": err.status_label(),
                "message": err.to_string(),
                "kind": if err.is_operational() { "operational" } else { "unexpected" },
                "detail": format!("{err:?}"),
            }),
        ),
        EnvMode::Production if err.is_operational() => (
            status,
            json!({
                "status": err.status_label(),
                "message": err.to_string(),
            }),
        ),
        EnvMode::Production => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "status": "ERROR",
                "message": "Oops! Something went very wrong. :(",
            }),
        ),
    }
}

/// Boundary layer: every failure raised in request handling passes through
/// here exactly once before a response is sent.
pub async fn normalize(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let res = next.run(req).await;
    let Some(err) = res.extensions().get::<Arc<ApiError>>().cloned() else {
        return res;
    };
    if !err.is_operational() {
        error!(detail = ?err, "unexpected failure");
    }
    let (status, body) = render(&err, state.config.env);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod render_tests {
    use super::*;

    fn unexpected() -> ApiError {
        ApiError::Unexpected(anyhow::anyhow!("pool timed out"))
    }

    #[test]
    fn development_echoes_full_detail() {
        let (status, body) = render(&ApiError::bad_request("Invalid email"), EnvMode::Development);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Invalid email");
        assert_eq!(body["kind"], "operational");
        assert!(body["detail"].as_str().unwrap().contains("Invalid email"));
    }

    #[test]
    fn development_shows_unexpected_detail() {
        let (status, body) = render(&unexpected(), EnvMode::Development);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "unexpected");
        assert!(body["detail"].as_str().unwrap().contains("pool timed out"));
    }

    #[test]
    fn production_operational_shows_only_status_and_message() {
        let err = ApiError::unauthorized("Incorrect email or password");
        let (status, body) = render(&err, EnvMode::Production);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({"status": "fail", "message": "Incorrect email or password"})
        );
    }

    #[test]
    fn production_unexpected_hides_detail() {
        let (status, body) = render(&unexpected(), EnvMode::Production);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"status": "ERROR", "message": "Oops! Something went very wrong. :("})
        );
    }

    #[test]
    fn status_label_distinguishes_client_and_server_errors() {
        assert_eq!(ApiError::not_found("gone").status_label(), "fail");
        assert_eq!(ApiError::internal("boom").status_label(), "error");
        assert_eq!(unexpected().status_label(), "error");
    }
}

#[cfg(test)]
mod remap_tests {
    use super::*;
    use jsonwebtoken::errors::{Error as JwtError, ErrorKind};

    #[test]
    fn expired_token_maps_to_its_own_message() {
        let err = ApiError::from(JwtError::from(ErrorKind::ExpiredSignature));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Login token expired. Please log in again");
    }

    #[test]
    fn other_token_failures_map_to_invalid_token() {
        let err = ApiError::from(JwtError::from(ErrorKind::InvalidSignature));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Invalid login token. Please log in again");

        let err = ApiError::from(JwtError::from(ErrorKind::InvalidToken));
        assert_eq!(err.to_string(), "Invalid login token. Please log in again");
    }

    #[test]
    fn malformed_identifier_maps_to_bad_request() {
        let parse_err = "not-a-uuid".parse::<uuid::Uuid>().unwrap_err();
        let err = ApiError::from(parse_err);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid identifier"));
        assert!(err.is_operational());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_operational());
    }

    #[test]
    fn unknown_database_errors_stay_unexpected() {
        let err = ApiError::from(sqlx::Error::PoolTimedOut);
        assert!(!err.is_operational());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
