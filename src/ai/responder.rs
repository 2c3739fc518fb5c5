use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest,
    },
    Client,
};
use std::time::Duration;
use tracing::error;

use crate::ai::context::HistoryRole;
use crate::ai::prompt::BuiltPrompt;
use crate::config::AppConfig;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat client with retries disabled. A 429 has to surface on the first
/// response so it maps to its fallback string; the default retrying client
/// would back off until the outer timeout fires and the user would see the
/// wrong message.
pub fn chat_client(config: &AppConfig) -> Client<OpenAIConfig> {
    let no_retry = backoff::ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    };

    Client::build(
        reqwest::Client::new(),
        OpenAIConfig::new()
            .with_api_key(config.chat_api_key.clone())
            .with_api_base(config.chat_api_base.clone()),
        no_retry,
    )
}

pub const EMPTY_REPLY_FALLBACK: &str =
    "I received your question. How can I help you with your health concerns?";
pub const CONFIG_FALLBACK: &str =
    "The AI assistant is not configured yet. Please contact support.";
pub const RATE_LIMIT_FALLBACK: &str =
    "Rate limit reached. Please wait a moment and try again.";
pub const UNAVAILABLE_FALLBACK: &str =
    "The AI model is currently loading. Please try again in a few seconds.";
pub const GENERIC_FALLBACK: &str =
    "I apologize, but I encountered an error. Please try again.";

/// Sends the prompt plus the new user message to the chat model and returns
/// the reply text. Infallible by contract: every failure class maps to a
/// fixed fallback string, so chat callers always have something to show and
/// to persist.
pub async fn respond(
    client: &Client<OpenAIConfig>,
    config: &AppConfig,
    prompt: &BuiltPrompt,
    new_message: &str,
) -> String {
    if config.chat_api_key.is_empty() {
        return CONFIG_FALLBACK.to_string();
    }

    match tokio::time::timeout(RESPONSE_TIMEOUT, try_respond(client, config, prompt, new_message))
        .await
    {
        Ok(Ok(Some(text))) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => EMPTY_REPLY_FALLBACK.to_string(),
        Ok(Err(e)) => {
            error!("Chat completion failed: {:?}", e);
            fallback_for(&e).to_string()
        }
        Err(_) => UNAVAILABLE_FALLBACK.to_string(),
    }
}

async fn try_respond(
    client: &Client<OpenAIConfig>,
    config: &AppConfig,
    prompt: &BuiltPrompt,
    new_message: &str,
) -> Result<Option<String>, OpenAIError> {
    let mut messages: Vec<ChatCompletionRequestMessage> =
        Vec::with_capacity(prompt.history.len() + 2);

    messages.push(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system_instruction.clone())
            .build()?
            .into(),
    );

    for entry in &prompt.history {
        match entry.role {
            HistoryRole::User => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(entry.content.clone())
                    .build()?
                    .into(),
            ),
            HistoryRole::Assistant => messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(entry.content.clone())
                    .build()?
                    .into(),
            ),
        }
    }

    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(new_message.to_string())
            .build()?
            .into(),
    );

    let request = CreateChatCompletionRequest {
        messages,
        model: config.chat_model.clone(),
        max_tokens: Some(800),
        temperature: Some(0.7),
        top_p: Some(0.9),
        ..Default::default()
    };

    let response = client.chat().create(request).await?;
    Ok(response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone()))
}

/// Maps a model-client error to the fallback string shown to the user.
/// Checks the structured error type first, then falls back to scanning the
/// display text, since upstream gateways wrap statuses inconsistently.
fn fallback_for(err: &OpenAIError) -> &'static str {
    if let OpenAIError::ApiError(api) = err {
        if let Some(kind) = &api.r#type {
            if kind.contains("rate_limit") {
                return RATE_LIMIT_FALLBACK;
            }
            if kind.contains("invalid_api_key") || kind.contains("authentication") {
                return CONFIG_FALLBACK;
            }
        }
    }

    let text = err.to_string().to_lowercase();
    if text.contains("rate limit") || text.contains("429") {
        RATE_LIMIT_FALLBACK
    } else if text.contains("unavailable") || text.contains("overloaded") || text.contains("503") {
        UNAVAILABLE_FALLBACK
    } else if text.contains("api key") || text.contains("unauthorized") || text.contains("401") {
        CONFIG_FALLBACK
    } else {
        GENERIC_FALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_error(message: &str, kind: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: None,
        })
    }

    fn upstream_config(api_base: String) -> AppConfig {
        AppConfig {
            database_url: String::new(),
            jwt_secret: String::new(),
            bind_address: String::new(),
            chat_api_base: api_base,
            chat_api_key: "test-key".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            vision_api_base: String::new(),
            vision_api_key: String::new(),
            vision_model: String::new(),
        }
    }

    fn empty_prompt() -> BuiltPrompt {
        BuiltPrompt {
            system_instruction: "You are a helpful assistant.".to_string(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn a_rate_limited_upstream_yields_the_rate_limit_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_raw(
                r#"{"error":{"message":"Too many requests","type":"rate_limit_exceeded","param":null,"code":null}}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let config = upstream_config(server.uri());
        let client = chat_client(&config);

        let reply = respond(&client, &config, &empty_prompt(), "hello").await;
        assert_eq!(
            reply,
            "Rate limit reached. Please wait a moment and try again."
        );
    }

    #[tokio::test]
    async fn a_successful_completion_returns_the_reply_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"id":"chatcmpl-1","object":"chat.completion","created":0,"model":"gpt-4o-mini","choices":[{"index":0,"message":{"role":"assistant","content":"You have one appointment."},"finish_reason":"stop","logprobs":null}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let config = upstream_config(server.uri());
        let client = chat_client(&config);

        let reply = respond(&client, &config, &empty_prompt(), "hello").await;
        assert_eq!(reply, "You have one appointment.");
    }

    #[tokio::test]
    async fn missing_chat_key_yields_the_config_message_without_a_call() {
        let mut config = upstream_config("http://127.0.0.1:1".to_string());
        config.chat_api_key = String::new();
        let client = chat_client(&config);

        let reply = respond(&client, &config, &empty_prompt(), "hello").await;
        assert_eq!(reply, CONFIG_FALLBACK);
    }

    #[test]
    fn rate_limit_errors_map_to_the_rate_limit_message() {
        let err = api_error("Too many requests", Some("rate_limit_exceeded"));
        assert_eq!(
            fallback_for(&err),
            "Rate limit reached. Please wait a moment and try again."
        );
    }

    #[test]
    fn http_429_in_the_message_also_maps_to_rate_limit() {
        let err = api_error("upstream returned 429", None);
        assert_eq!(fallback_for(&err), RATE_LIMIT_FALLBACK);
    }

    #[test]
    fn bad_credentials_map_to_the_config_message() {
        let err = api_error("Incorrect API key provided", Some("invalid_api_key"));
        assert_eq!(fallback_for(&err), CONFIG_FALLBACK);
    }

    #[test]
    fn overloaded_upstreams_map_to_the_unavailable_message() {
        let err = api_error("The model is overloaded", None);
        assert_eq!(fallback_for(&err), UNAVAILABLE_FALLBACK);
    }

    #[test]
    fn unclassified_errors_map_to_the_generic_message() {
        let err = api_error("something odd happened", None);
        assert_eq!(
            fallback_for(&err),
            "I apologize, but I encountered an error. Please try again."
        );
    }
}
