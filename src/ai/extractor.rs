use anyhow::{anyhow, bail, Context};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::error;

use crate::config::AppConfig;
use crate::prompts::Prompts;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const VISION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one extraction attempt. `success: false` still carries a
/// usable `data` object so downstream consumers never see a hole.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub raw_text: Option<String>,
}

/// Runs the full extraction: fetch the stored document, send it to the
/// vision model, parse what comes back. Never returns Err: any failure
/// along the way is folded into a `success: false` outcome with a minimal
/// fallback object, so a broken document cannot fail the request.
pub async fn extract_document(
    http: &reqwest::Client,
    config: &AppConfig,
    storage_url: &str,
    mime_hint: Option<&str>,
) -> ExtractionOutcome {
    match try_extract(http, config, storage_url, mime_hint).await {
        Ok((data, raw_text)) => ExtractionOutcome {
            success: true,
            data,
            error: None,
            raw_text: Some(raw_text),
        },
        Err(e) => {
            error!("Document extraction failed for {}: {:#}", storage_url, e);
            ExtractionOutcome {
                success: false,
                data: json!({
                    "document_type": "Medical Document",
                    "extraction_method": "failed",
                    "error": e.to_string(),
                }),
                error: Some(e.to_string()),
                raw_text: None,
            }
        }
    }
}

async fn try_extract(
    http: &reqwest::Client,
    config: &AppConfig,
    storage_url: &str,
    mime_hint: Option<&str>,
) -> anyhow::Result<(Value, String)> {
    if config.vision_api_key.is_empty() {
        bail!("vision API key is not configured");
    }

    let response = http
        .get(storage_url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .context("fetching document")?
        .error_for_status()
        .context("fetching document")?;

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .or_else(|| mime_hint.map(str::to_string))
        .unwrap_or_else(|| "image/jpeg".to_string());

    let bytes = response.bytes().await.context("reading document body")?;
    let encoded = BASE64.encode(&bytes);

    let url = format!(
        "{}/models/{}:generateContent?key={}",
        config.vision_api_base, config.vision_model, config.vision_api_key
    );

    let request_body = json!({
        "contents": [{
            "parts": [
                { "text": Prompts::EXTRACTION },
                { "inline_data": { "mime_type": mime_type, "data": encoded } }
            ]
        }]
    });

    let vision_response = http
        .post(&url)
        .json(&request_body)
        .timeout(VISION_TIMEOUT)
        .send()
        .await
        .context("calling vision model")?;

    let status = vision_response.status();
    if !status.is_success() {
        bail!("vision model returned status {}", status);
    }

    let body: Value = vision_response
        .json()
        .await
        .context("decoding vision response")?;

    let text = response_text(&body)
        .ok_or_else(|| anyhow!("vision response contained no text candidates"))?;

    Ok((parse_extraction(&text), text))
}

/// Joins the text parts of the first candidate, if any.
fn response_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parsing ladder for the model's reply. In order: the whole reply as JSON,
/// a ```json fenced block, a bare ``` fenced block, and finally a wrapper
/// object carrying the raw text. The ladder cannot fail.
pub fn parse_extraction(text: &str) -> Value {
    let trimmed = text.trim();

    let parsed = serde_json::from_str::<Value>(trimmed)
        .ok()
        .or_else(|| fenced_block(trimmed, "```json").and_then(|b| serde_json::from_str(&b).ok()))
        .or_else(|| fenced_block(trimmed, "```").and_then(|b| serde_json::from_str(&b).ok()));

    let mut value = match parsed {
        Some(v) => v,
        None => json!({
            "document_type": "Medical Document",
            "raw_extraction": trimmed,
        }),
    };

    if let Some(obj) = value.as_object_mut() {
        let method = if obj.contains_key("raw_extraction") {
            "raw_text"
        } else {
            "structured"
        };
        obj.insert("extraction_method".to_string(), json!(method));
    }

    value
}

/// Content between an opening fence marker and the closing ``` after it.
fn fenced_block(text: &str, marker: &str) -> Option<String> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    let block = rest[..end].trim();
    if block.is_empty() {
        None
    } else {
        Some(block.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vision_config(api_base: String, api_key: &str) -> AppConfig {
        AppConfig {
            database_url: String::new(),
            jwt_secret: String::new(),
            bind_address: String::new(),
            chat_api_base: String::new(),
            chat_api_key: String::new(),
            chat_model: String::new(),
            vision_api_base: api_base,
            vision_api_key: api_key.to_string(),
            vision_model: "gemini-test".to_string(),
        }
    }

    #[tokio::test]
    async fn fetches_a_document_and_returns_parsed_fields_with_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/scan.jpg"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xD8, 0xFF], "image/jpeg"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"candidates":[{"content":{"parts":[{"text":"```json\n{\"document_type\": \"Lab Report\"}\n```"}]}}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let config = vision_config(server.uri(), "test-key");
        let http = reqwest::Client::new();
        let storage_url = format!("{}/files/scan.jpg", server.uri());

        let outcome = extract_document(&http, &config, &storage_url, None).await;

        assert!(outcome.success);
        assert_eq!(outcome.data["document_type"], "Lab Report");
        assert_eq!(outcome.data["extraction_method"], "structured");
        assert!(outcome.raw_text.unwrap().contains("Lab Report"));
    }

    #[tokio::test]
    async fn missing_vision_key_fails_without_touching_the_network() {
        let config = vision_config("http://127.0.0.1:1".to_string(), "");
        let http = reqwest::Client::new();

        let outcome = extract_document(&http, &config, "http://127.0.0.1:1/doc.jpg", None).await;

        assert!(!outcome.success);
        assert!(outcome.raw_text.is_none());
        assert_eq!(outcome.data["document_type"], "Medical Document");
        assert!(outcome.error.unwrap().contains("not configured"));
    }

    #[test]
    fn parses_direct_json_reply() {
        let value = parse_extraction(r#"{"document_type": "Prescription", "diagnosis": "Flu"}"#);
        assert_eq!(value["document_type"], "Prescription");
        assert_eq!(value["extraction_method"], "structured");
    }

    #[test]
    fn parses_json_fenced_reply() {
        let reply = "Here is the result:\n```json\n{\"document_type\": \"Lab Report\"}\n```\nDone.";
        let value = parse_extraction(reply);
        assert_eq!(value["document_type"], "Lab Report");
        assert_eq!(value["extraction_method"], "structured");
    }

    #[test]
    fn parses_bare_fenced_reply() {
        let reply = "```\n{\"document_type\": \"Medical Certificate\"}\n```";
        let value = parse_extraction(reply);
        assert_eq!(value["document_type"], "Medical Certificate");
    }

    #[test]
    fn wraps_unparseable_reply_instead_of_failing() {
        let value = parse_extraction("The image shows a handwritten prescription for amoxicillin.");
        assert_eq!(value["document_type"], "Medical Document");
        assert_eq!(
            value["raw_extraction"],
            "The image shows a handwritten prescription for amoxicillin."
        );
        assert_eq!(value["extraction_method"], "raw_text");
    }

    #[test]
    fn non_object_json_passes_through_untagged() {
        let value = parse_extraction("[1, 2, 3]");
        assert!(value.is_array());
    }

    #[test]
    fn fenced_block_requires_a_closing_fence() {
        assert!(fenced_block("```json\n{\"a\": 1}", "```json").is_none());
    }
}
