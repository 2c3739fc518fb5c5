use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// The file itself lives in the external blob store; this only records
/// where it is and what it is called.
#[derive(Deserialize)]
pub struct AttachDocumentRequest {
    pub storage_url: String,
    pub file_name: String,
    pub file_type: Option<String>,
}
