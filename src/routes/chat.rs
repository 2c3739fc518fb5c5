use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use std::sync::Arc;

use crate::ai::context::{
    assemble_appointment_context, assemble_general_context, recent_history,
};
use crate::ai::prompt::build_prompt;
use crate::ai::responder::respond;
use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ChatMessage, Sender};
use crate::routes::ok;
use crate::types::{ChatMessagesQuery, SendMessageRequest};
use crate::AppState;

const MESSAGES_PAGE_LIMIT: i64 = 100;

/// Scoped read when an appointment id is given; the account's combined
/// history across every scope when it is absent.
#[get("/messages")]
pub async fn get_messages(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    query: web::Query<ChatMessagesQuery>,
) -> Result<HttpResponse, ApiError> {
    let messages = match query.appointment_id {
        Some(appointment_id) => {
            ChatMessage::history(
                &app_state.pool,
                authenticated_user.user_id,
                Some(appointment_id),
                MESSAGES_PAGE_LIMIT,
            )
            .await?
        }
        None => {
            ChatMessage::history_all(
                &app_state.pool,
                authenticated_user.user_id,
                MESSAGES_PAGE_LIMIT,
            )
            .await?
        }
    };

    Ok(ok(messages))
}

/// One chat turn. The order here is load-bearing: authorization happens
/// before anything is persisted, and the user message is persisted before
/// the model is called so a model failure never loses the question. The
/// fallback text is stored as the AI message like any other reply.
#[post("/send")]
pub async fn send_message(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();
    let user_id = authenticated_user.user_id;
    let role = authenticated_user.role;

    if request.message.trim().is_empty() {
        return Err(ApiError::Validation("Message is required".to_string()));
    }

    let bundle = match request.appointment_id {
        Some(appointment_id) => {
            assemble_appointment_context(&app_state.pool, appointment_id, user_id, role).await?
        }
        None => assemble_general_context(&app_state.pool, user_id, role).await?,
    };
    let history = recent_history(&app_state.pool, user_id, request.appointment_id).await?;

    let user_message = ChatMessage::append(
        &app_state.pool,
        user_id,
        request.appointment_id,
        Sender::User,
        request.message.trim(),
    )
    .await?;

    let prompt = build_prompt(&bundle, &history, role);
    let reply = respond(
        &app_state.oai_client,
        &app_state.config,
        &prompt,
        request.message.trim(),
    )
    .await;

    let ai_message = ChatMessage::append(
        &app_state.pool,
        user_id,
        request.appointment_id,
        Sender::Ai,
        &reply,
    )
    .await?;

    Ok(ok(json!({
        "user_message": user_message,
        "ai_message": ai_message,
    })))
}
