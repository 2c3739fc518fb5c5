use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::appointment::AppointmentSummary;
use crate::models::{Appointment, ChatMessage, Document, ExtractedContent, Role, Sender};

/// General-assistant scope: recent appointments included in the bundle.
pub const GENERAL_APPOINTMENT_LIMIT: i64 = 20;
/// Bounded chat history per scope. The source of these numbers varied by
/// call site; one constant per scope here.
pub const GENERAL_HISTORY_LIMIT: i64 = 10;
pub const APPOINTMENT_HISTORY_LIMIT: i64 = 20;

/// The other party on an appointment, as seen from the caller's role.
/// A patient caller only ever sees doctor fields, and vice versa.
#[derive(Debug, Clone)]
pub enum Counterpart {
    Doctor {
        name: String,
        specialty: Option<String>,
        hospital: Option<String>,
    },
    Patient {
        name: String,
        age: Option<i32>,
        gender: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub content: ExtractedContent,
}

#[derive(Debug, Clone)]
pub struct AppointmentContext {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub counterpart: Counterpart,
    pub documents: Vec<DocumentContext>,
}

/// Plain data bundle handed to the prompt builder. Fields are present iff
/// the underlying records have them; no further guarantees.
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub appointments: Vec<AppointmentContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One prior chat turn in the generic shape the model client expects.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

fn counterpart_from(summary: &AppointmentSummary, role: Role) -> Counterpart {
    match role {
        Role::Patient => Counterpart::Doctor {
            name: summary.counterpart_name.clone(),
            specialty: summary.specialty.clone(),
            hospital: summary.hospital.clone(),
        },
        Role::Doctor => Counterpart::Patient {
            name: summary.counterpart_name.clone(),
            age: summary.age,
            gender: summary.gender.clone(),
        },
    }
}

/// Bundle for the general assistant: up to the 20 most recent appointments,
/// metadata and notes only, no per-document loop. An empty result is not an
/// error.
pub async fn assemble_general_context(
    pool: &PgPool,
    user_id: Uuid,
    role: Role,
) -> Result<ContextBundle, ApiError> {
    let summaries = Appointment::list_for(pool, user_id, role, GENERAL_APPOINTMENT_LIMIT).await?;

    let appointments = summaries
        .into_iter()
        .map(|summary| {
            let counterpart = counterpart_from(&summary, role);
            AppointmentContext {
                id: summary.id,
                date: summary.appointment_date,
                notes: summary.notes,
                counterpart,
                documents: Vec::new(),
            }
        })
        .collect();

    Ok(ContextBundle { appointments })
}

/// Bundle for an appointment-scoped chat: exactly one appointment with every
/// attached document's extracted text (document counts per appointment are
/// small). NotFound if the id does not resolve; AccessDenied if the caller
/// is neither party.
pub async fn assemble_appointment_context(
    pool: &PgPool,
    appointment_id: Uuid,
    user_id: Uuid,
    role: Role,
) -> Result<ContextBundle, ApiError> {
    let appointment = Appointment::get_by_id(pool, appointment_id)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;

    if !appointment.is_party(user_id) {
        return Err(ApiError::AccessDenied);
    }

    let summary = Appointment::summary_for(pool, appointment_id, role)
        .await?
        .ok_or(ApiError::NotFound("Appointment"))?;

    let documents = Document::list_for_appointment(pool, appointment_id)
        .await?
        .into_iter()
        .map(|doc| DocumentContext {
            file_name: doc.file_name,
            uploaded_at: doc.created_at,
            content: ExtractedContent::from_stored(doc.ocr_text.as_deref()),
        })
        .collect();

    let counterpart = counterpart_from(&summary, role);

    Ok(ContextBundle {
        appointments: vec![AppointmentContext {
            id: summary.id,
            date: summary.appointment_date,
            notes: summary.notes,
            counterpart,
            documents,
        }],
    })
}

/// Bounded chat history for the scope, strictly chronological (oldest first)
/// regardless of the descending retrieval used to bound it.
pub async fn recent_history(
    pool: &PgPool,
    user_id: Uuid,
    appointment_id: Option<Uuid>,
) -> Result<Vec<HistoryEntry>, ApiError> {
    let limit = if appointment_id.is_some() {
        APPOINTMENT_HISTORY_LIMIT
    } else {
        GENERAL_HISTORY_LIMIT
    };

    let messages = ChatMessage::recent(pool, user_id, appointment_id, limit).await?;
    Ok(into_history(messages))
}

/// Reorders a bounded batch of messages into chronological order and maps
/// them to the generic `{role, content}` shape.
pub fn into_history(mut messages: Vec<ChatMessage>) -> Vec<HistoryEntry> {
    messages.sort_by_key(|m| m.created_at);
    messages
        .into_iter()
        .map(|m| HistoryEntry {
            role: match m.sender {
                Sender::User => HistoryRole::User,
                Sender::Ai => HistoryRole::Assistant,
            },
            content: m.message,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(sender: Sender, text: &str, minutes_ago: i64) -> ChatMessage {
        ChatMessage {
            sender,
            message: text.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            ..Default::default()
        }
    }

    #[test]
    fn history_is_chronological_regardless_of_input_order() {
        let messages = vec![
            message(Sender::Ai, "third", 1),
            message(Sender::User, "first", 9),
            message(Sender::Ai, "second", 5),
        ];

        let history = into_history(messages);

        assert_eq!(history.len(), 3);
        let contents: Vec<&str> = history.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn senders_map_to_generic_roles() {
        let history = into_history(vec![
            message(Sender::User, "question", 2),
            message(Sender::Ai, "answer", 1),
        ]);

        assert_eq!(history[0].role, HistoryRole::User);
        assert_eq!(history[1].role, HistoryRole::Assistant);
    }

    #[test]
    fn empty_input_yields_empty_history() {
        assert!(into_history(Vec::new()).is_empty());
    }
}
