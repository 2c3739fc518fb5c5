use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    /// Absent for the general assistant, present for an appointment-scoped
    /// conversation.
    pub appointment_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ChatMessagesQuery {
    pub appointment_id: Option<Uuid>,
}
