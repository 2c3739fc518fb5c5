use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::ai::extractor::extract_document;
use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Appointment, Document};
use crate::routes::ok;
use crate::AppState;

/// Runs extraction for one attached document. The stored extraction is only
/// overwritten on success; a failed run reports the error and leaves any
/// previous result in place.
#[post("/{appointment_id}/{document_id}")]
pub async fn extract(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (appointment_id, document_id) = path.into_inner();

    let appointment = Appointment::get_by_id(&app_state.pool, appointment_id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;
    if !appointment.is_party(authenticated_user.user_id) {
        return Err(ApiError::AccessDenied);
    }

    let document = Document::get(&app_state.pool, appointment_id, document_id)
        .await?
        .ok_or(ApiError::NotFound("Document"))?;

    let outcome = extract_document(
        &app_state.http,
        &app_state.config,
        &document.storage_url,
        Some(&document.file_type),
    )
    .await;

    if outcome.success {
        let stored = serde_json::to_string(&outcome.data)
            .map_err(|e| ApiError::Internal(e.into()))?;
        Document::set_ocr_text(&app_state.pool, document_id, &stored).await?;
        Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome.data,
            "raw_text": outcome.raw_text,
        })))
    } else {
        Ok(HttpResponse::Ok().json(json!({
            "success": false,
            "message": outcome.error,
            "data": outcome.data,
        })))
    }
}

/// Descriptor of the extraction method(s) this deployment can run.
#[get("/methods")]
pub async fn methods(app_state: web::Data<Arc<AppState>>) -> Result<HttpResponse, ApiError> {
    let config = &app_state.config;

    Ok(ok(json!([{
        "id": "vision",
        "name": "Vision model extraction",
        "model": config.vision_model,
        "available": !config.vision_api_key.is_empty(),
    }])))
}
