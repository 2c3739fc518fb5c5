use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "sender_enum", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "lowercase")] // JSON value name
pub enum Sender {
    User,
    Ai,
}

/// One turn in a conversation. Messages are immutable once created and are
/// never deleted in normal flow.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    /// None for the user's general assistant, Some for appointment-scoped
    /// conversations.
    pub appointment_id: Option<Uuid>,
    pub sender: Sender,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub async fn append(
        pool: &PgPool,
        user_id: Uuid,
        appointment_id: Option<Uuid>,
        sender: Sender,
        message: &str,
    ) -> Result<Self, sqlx::Error> {
        let msg = ChatMessage {
            user_id,
            appointment_id,
            sender,
            message: message.to_string(),
            ..Default::default()
        };

        sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (id, user_id, appointment_id, sender, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(msg.id)
        .bind(msg.user_id)
        .bind(msg.appointment_id)
        .bind(msg.sender)
        .bind(&msg.message)
        .bind(msg.created_at)
        .fetch_one(pool)
        .await
    }

    /// Most recent messages for the scope, newest first. Callers that need
    /// chronological order re-sort (see `ai::context::into_history`).
    pub async fn recent(
        pool: &PgPool,
        user_id: Uuid,
        appointment_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = match appointment_id {
            Some(aid) => sqlx::query_as::<_, ChatMessage>(
                r#"
                SELECT * FROM chat_messages
                WHERE user_id = $1 AND appointment_id = $2
                ORDER BY created_at DESC
                LIMIT $3
                "#,
            )
            .bind(user_id)
            .bind(aid)
            .bind(limit),
            None => sqlx::query_as::<_, ChatMessage>(
                r#"
                SELECT * FROM chat_messages
                WHERE user_id = $1 AND appointment_id IS NULL
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(user_id)
            .bind(limit),
        };

        query.fetch_all(pool).await
    }

    /// Scope history in creation order, for the read-only messages endpoint.
    pub async fn history(
        pool: &PgPool,
        user_id: Uuid,
        appointment_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut messages = Self::recent(pool, user_id, appointment_id, limit).await?;
        messages.reverse();
        Ok(messages)
    }

    /// Everything the user has said and been told, across the general
    /// assistant and every appointment scope, in creation order.
    pub async fn history_all(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_messages
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }
}

impl Default for ChatMessage {
    fn default() -> Self {
        ChatMessage {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            appointment_id: None,
            sender: Sender::User,
            message: String::new(),
            created_at: Utc::now(),
        }
    }
}
