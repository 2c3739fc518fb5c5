use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub storage_url: String,
    pub file_name: String,
    pub file_type: String,
    /// Dual-purpose field: a JSON-serialized extraction result, or plain OCR
    /// text from older uploads. Consumers classify it once via
    /// [`ExtractedContent::from_stored`] and pattern-match.
    pub ocr_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Classified view of a document's stored extraction field.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    /// A structured extraction result (JSON object of medical fields).
    Structured(serde_json::Map<String, Value>),
    /// Raw OCR or other unstructured text.
    PlainText(String),
    /// Nothing extracted yet.
    Empty,
}

impl ExtractedContent {
    pub fn from_stored(stored: Option<&str>) -> Self {
        let text = match stored {
            Some(s) if !s.trim().is_empty() => s,
            _ => return ExtractedContent::Empty,
        };
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => ExtractedContent::Structured(map),
            _ => ExtractedContent::PlainText(text.to_string()),
        }
    }
}

impl Document {
    pub async fn attach(
        pool: &PgPool,
        appointment_id: Uuid,
        storage_url: &str,
        file_name: &str,
        file_type: &str,
    ) -> Result<Self, sqlx::Error> {
        let document = Document {
            appointment_id,
            storage_url: storage_url.to_string(),
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            ..Default::default()
        };

        sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents
                (id, appointment_id, storage_url, file_name, file_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(document.id)
        .bind(document.appointment_id)
        .bind(&document.storage_url)
        .bind(&document.file_name)
        .bind(&document.file_type)
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(pool)
        .await
    }

    pub async fn get(
        pool: &PgPool,
        appointment_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE id = $1 AND appointment_id = $2",
        )
        .bind(id)
        .bind(appointment_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_appointment(
        pool: &PgPool,
        appointment_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE appointment_id = $1 ORDER BY created_at",
        )
        .bind(appointment_id)
        .fetch_all(pool)
        .await
    }

    /// Overwrites the stored extraction field. Only called after a successful
    /// extraction; a failed one must leave the previous value untouched.
    pub async fn set_ocr_text(pool: &PgPool, id: Uuid, ocr_text: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE documents SET ocr_text = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(ocr_text)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn remove(
        pool: &PgPool,
        appointment_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND appointment_id = $2")
            .bind(id)
            .bind(appointment_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document {
            id: Uuid::new_v4(),
            appointment_id: Uuid::nil(),
            storage_url: String::new(),
            file_name: String::new(),
            file_type: String::new(),
            ocr_text: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_stored_json_object() {
        let stored = r#"{"diagnosis":"Flu","medicines":["Paracetamol"]}"#;
        match ExtractedContent::from_stored(Some(stored)) {
            ExtractedContent::Structured(map) => {
                assert_eq!(map["diagnosis"], "Flu");
            }
            other => panic!("expected Structured, got {:?}", other),
        }
    }

    #[test]
    fn classifies_plain_text() {
        let content = ExtractedContent::from_stored(Some("Take two tablets daily"));
        assert_eq!(
            content,
            ExtractedContent::PlainText("Take two tablets daily".to_string())
        );
    }

    #[test]
    fn non_object_json_is_plain_text() {
        // A bare number parses as JSON but is not an extraction result.
        let content = ExtractedContent::from_stored(Some("42"));
        assert_eq!(content, ExtractedContent::PlainText("42".to_string()));
    }

    #[test]
    fn missing_or_blank_is_empty() {
        assert_eq!(ExtractedContent::from_stored(None), ExtractedContent::Empty);
        assert_eq!(
            ExtractedContent::from_stored(Some("   ")),
            ExtractedContent::Empty
        );
    }
}
