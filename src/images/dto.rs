use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::images::repo::Image;

#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    pub id: Uuid,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ImageListResponse {
    pub status: &'static str,
    pub images: Vec<Image>,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub status: &'static str,
    pub img: Image,
}
