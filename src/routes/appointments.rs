use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Appointment, Document, Role, User};
use crate::routes::{created, ok};
use crate::types::{AttachDocumentRequest, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::AppState;

const LIST_LIMIT: i64 = 100;
const DEFAULT_FILE_TYPE: &str = "image/jpeg";

/// Loads the appointment and checks the caller is one of its parties.
async fn load_for_party(
    app_state: &AppState,
    appointment_id: Uuid,
    user_id: Uuid,
) -> Result<Appointment, ApiError> {
    let appointment = Appointment::get_by_id(&app_state.pool, appointment_id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;

    if !appointment.is_party(user_id) {
        return Err(ApiError::AccessDenied);
    }

    Ok(appointment)
}

/// Loads the appointment and checks the caller is the owning patient.
async fn load_for_owner(
    app_state: &AppState,
    appointment_id: Uuid,
    user_id: Uuid,
) -> Result<Appointment, ApiError> {
    let appointment = Appointment::get_by_id(&app_state.pool, appointment_id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;

    if !appointment.owned_by(user_id) {
        return Err(ApiError::AccessDenied);
    }

    Ok(appointment)
}

#[get("")]
pub async fn list_appointments(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let appointments = Appointment::list_for(
        &app_state.pool,
        authenticated_user.user_id,
        authenticated_user.role,
        LIST_LIMIT,
    )
    .await?;

    Ok(ok(appointments))
}

/// The booking counterpart list: all doctors for a patient, the doctor's
/// own distinct patients for a doctor.
#[get("/related")]
pub async fn related_users(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let users = match authenticated_user.role {
        Role::Patient => User::list_doctors(&app_state.pool).await?,
        Role::Doctor => User::patients_of(&app_state.pool, authenticated_user.user_id).await?,
    };

    Ok(ok(users))
}

#[get("/{appointment_id}")]
pub async fn get_appointment(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    appointment_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let appointment_id = appointment_id.into_inner();
    load_for_party(&app_state, appointment_id, authenticated_user.user_id).await?;

    let summary =
        Appointment::summary_for(&app_state.pool, appointment_id, authenticated_user.role)
            .await?
            .ok_or(ApiError::NotFound("Appointment"))?;
    let documents = Document::list_for_appointment(&app_state.pool, appointment_id).await?;

    Ok(ok(json!({ "appointment": summary, "documents": documents })))
}

#[post("")]
pub async fn create_appointment(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    request: web::Json<CreateAppointmentRequest>,
) -> Result<HttpResponse, ApiError> {
    if authenticated_user.role != Role::Patient {
        return Err(ApiError::AccessDenied);
    }

    let doctor = User::get_by_id(&app_state.pool, request.doctor_id)
        .await?
        .ok_or(ApiError::NotFound("Doctor"))?;
    if doctor.role != Role::Doctor {
        return Err(ApiError::Validation(
            "Selected user is not a doctor".to_string(),
        ));
    }

    let appointment = Appointment::create(
        &app_state.pool,
        authenticated_user.user_id,
        request.doctor_id,
        request.appointment_date,
        request.notes.as_deref(),
    )
    .await?;

    Ok(created(appointment))
}

#[put("/{appointment_id}")]
pub async fn update_appointment(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    appointment_id: web::Path<Uuid>,
    request: web::Json<UpdateAppointmentRequest>,
) -> Result<HttpResponse, ApiError> {
    let appointment_id = appointment_id.into_inner();
    load_for_owner(&app_state, appointment_id, authenticated_user.user_id).await?;

    let appointment = Appointment::update(
        &app_state.pool,
        appointment_id,
        request.appointment_date,
        request.notes.as_deref(),
    )
    .await?;

    Ok(ok(appointment))
}

#[delete("/{appointment_id}")]
pub async fn delete_appointment(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    appointment_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let appointment_id = appointment_id.into_inner();
    load_for_owner(&app_state, appointment_id, authenticated_user.user_id).await?;

    Appointment::delete(&app_state.pool, appointment_id).await?;

    Ok(ok(json!({ "deleted": true })))
}

#[post("/{appointment_id}/documents")]
pub async fn attach_document(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    appointment_id: web::Path<Uuid>,
    request: web::Json<AttachDocumentRequest>,
) -> Result<HttpResponse, ApiError> {
    let appointment_id = appointment_id.into_inner();
    load_for_owner(&app_state, appointment_id, authenticated_user.user_id).await?;

    if request.storage_url.trim().is_empty() || request.file_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "storage_url and file_name are required".to_string(),
        ));
    }

    let document = Document::attach(
        &app_state.pool,
        appointment_id,
        request.storage_url.trim(),
        request.file_name.trim(),
        request.file_type.as_deref().unwrap_or(DEFAULT_FILE_TYPE),
    )
    .await?;

    Ok(created(document))
}

#[delete("/{appointment_id}/documents/{document_id}")]
pub async fn remove_document(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (appointment_id, document_id) = path.into_inner();
    load_for_owner(&app_state, appointment_id, authenticated_user.user_id).await?;

    let removed = Document::remove(&app_state.pool, appointment_id, document_id).await?;
    if !removed {
        return Err(ApiError::NotFound("Document"));
    }

    Ok(ok(json!({ "deleted": true })))
}
