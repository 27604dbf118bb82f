use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    error::ApiError,
    images::{
        dto::{DeleteImageRequest, ImageListResponse, ImageUploadResponse},
        repo::Image,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/", get(list_images))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/delete", delete(delete_image))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let images = Image::list(&state.db).await?;
    Ok(Json(ImageListResponse {
        status: "success",
        images,
    }))
}

#[instrument(skip(state, current, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    current: CurrentUser,
    mut mp: Multipart,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    let CurrentUser(user) = current;

    let mut upload: Option<(Bytes, String)> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Broken upload: {e}")))?;
        upload = Some((data, content_type));
        break;
    }
    let Some((data, content_type)) = upload else {
        return Err(ApiError::bad_request("image field is required"));
    };
    if !content_type.starts_with("image/") {
        return Err(ApiError::bad_request("Uploaded file must be an image."));
    }

    let now_ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let filename = make_filename(user.id, now_ms, ext_from_mime(&content_type));
    state.storage.put(&filename, data).await?;

    let img = Image::create(&state.db, &filename).await?;
    info!(user_id = %user.id, file = %img.name, "image uploaded");
    Ok(Json(ImageUploadResponse {
        status: "success",
        img,
    }))
}

#[instrument(skip(state, current, payload))]
pub async fn delete_image(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<DeleteImageRequest>,
) -> Result<StatusCode, ApiError> {
    let CurrentUser(user) = current;

    if let Err(e) = state.storage.delete(&payload.filename).await {
        error!(error = %e, file = %payload.filename, "file removal failed");
        return Err(ApiError::internal("Error deleting file"));
    }
    Image::delete(&state.db, payload.id).await?;

    info!(user_id = %user.id, file = %payload.filename, "image deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn make_filename(user_id: Uuid, now_ms: i128, ext: &str) -> String {
    format!("{user_id}-{now_ms}.{ext}")
}

fn ext_from_mime(ct: &str) -> &str {
    match ct {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        // mime subtype as-is, matching how browsers name the common ones
        _ => ct.split('/').nth(1).unwrap_or("bin"),
    }
}

#[cfg(test)]
mod naming_tests {
    use super::*;

    #[test]
    fn ext_from_mime_maps_common_types() {
        assert_eq!(ext_from_mime("image/jpeg"), "jpg");
        assert_eq!(ext_from_mime("image/jpg"), "jpg");
        assert_eq!(ext_from_mime("image/png"), "png");
        assert_eq!(ext_from_mime("image/webp"), "webp");
        assert_eq!(ext_from_mime("image/gif"), "gif");
        assert_eq!(ext_from_mime("image/svg+xml"), "svg+xml");
    }

    #[test]
    fn filename_embeds_owner_and_timestamp() {
        let user_id: Uuid = "6dd8bfa2-51a4-4baf-9f3f-44bd66560cbe".parse().unwrap();
        let name = make_filename(user_id, 1_754_000_000_000, "jpg");
        assert_eq!(
            name,
            "6dd8bfa2-51a4-4baf-9f3f-44bd66560cbe-1754000000000.jpg"
        );
    }
}
