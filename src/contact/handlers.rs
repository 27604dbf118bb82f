use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::{
    contact::dto::{ContactForm, ContactResponse},
    error::ApiError,
    mail,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/sendEmail", post(send_email))
}

#[instrument(skip(state, payload))]
pub async fn send_email(
    State(state): State<AppState>,
    Json(payload): Json<ContactForm>,
) -> Result<Json<ContactResponse>, ApiError> {
    let Some(fields) = payload.required_fields() else {
        return Err(ApiError::bad_request(
            "Name, email, phone and desc are required fields",
        ));
    };

    let cfg = &state.config.mail;
    let notification = mail::contact_notification(
        fields.name,
        fields.email,
        fields.desc,
        fields.phone,
        &cfg.site_title,
        &cfg.master_email,
    );
    state.mailer.send(notification).await?;

    if payload.send_copy {
        let copy = mail::contact_copy(
            fields.name,
            fields.email,
            fields.desc,
            fields.phone,
            &cfg.site_title,
        );
        state.mailer.send(copy).await?;
    }

    info!(from = %fields.email, "contact form relayed");
    Ok(Json(ContactResponse {
        status: "success",
        message: format!(
            "attempted to send email with following params: {}, {}, {}",
            fields.name, fields.email, fields.desc
        ),
    }))
}
