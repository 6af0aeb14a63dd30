use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::TextGenerator;
use crate::{
    app_config::{ApiConfig, ModelConfig},
    error::{AppError, AppResult},
    HttpClient,
};

const AI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(http_client: HttpClient, api: &ApiConfig, model: &ModelConfig) -> Self {
        Self {
            http_client,
            api_key: api.key.clone(),
            model: model.id.clone(),
            endpoint: AI_ENDPOINT.to_string(),
        }
    }
}

fn chat_request_body(
    model: &str,
    system_instruction: &str,
    user_instruction: &str,
    temperature: f64,
) -> serde_json::Value {
    json!({
        "model": model,
        "temperature": temperature,
        "messages": [
            {
                "role": "system",
                "content": system_instruction
            },
            {
                "role": "user",
                "content": user_instruction
            }
        ],
        "response_format": { "type": "json_object" }
    })
}

impl TextGenerator for OpenAiClient {
    async fn complete(
        &self,
        system_instruction: &str,
        user_instruction: &str,
        temperature: f64,
    ) -> AppResult<String> {
        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&chat_request_body(
                &self.model,
                system_instruction,
                user_instruction,
                temperature,
            ))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.json::<serde_json::Value>().await?;

        content_from_response(status, body)
    }
}

/// Message content of the first choice, or the API's error mapped by status
fn content_from_response(status: StatusCode, body: serde_json::Value) -> AppResult<String> {
    let parsed = serde_json::from_value::<ChatApiResponseOrError>(body.clone())
        .context(format!("Could not parse chat response: {}", body))?;

    let parsed = match parsed {
        ChatApiResponseOrError::Error(error) => {
            return Err(AppError::from_status(
                status,
                format!("Chat API error: {}", error.error.message),
            ));
        }
        ChatApiResponseOrError::Response(parsed) => parsed,
    };

    if let Some(usage) = &parsed.usage {
        tracing::debug!(
            "Chat completion used {} tokens ({} prompt, {} completion)",
            usage.total_tokens,
            usage.prompt_tokens,
            usage.completion_tokens
        );
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .context("No choices in response")?;

    if let Some(FinishReason::Length) = choice.finish_reason {
        tracing::warn!("Chat completion was cut off by the token limit");
    }

    let content = choice
        .message
        .content
        .context("No content in chat response message")?;

    Ok(content)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: i32,
    pub message: ChatMessage,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<PromptUsage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiError {
    pub error: ChatApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatApiResponseOrError {
    Response(ChatApiResponse),
    Error(ChatApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_body() {
        let body = chat_request_body("gpt-4o", "system text", "user text", 0.3);

        assert_eq!(body["model"], "gpt-4o");
        let temp = body["temperature"].as_f64().unwrap();
        assert!((temp - 0.3).abs() < 1e-9, "temperature was {temp}");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "user text");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_parse_chat_response() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"category\": \"work\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
        }"#;

        match serde_json::from_str::<ChatApiResponseOrError>(json).unwrap() {
            ChatApiResponseOrError::Response(resp) => {
                assert_eq!(resp.choices.len(), 1);
                assert_eq!(
                    resp.choices[0].message.content.as_deref(),
                    Some("{\"category\": \"work\"}")
                );
                assert_eq!(resp.choices[0].finish_reason, Some(FinishReason::Stop));
                assert_eq!(resp.usage.unwrap().total_tokens, 160);
            }
            other => panic!("Expected a response, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_chat_error() {
        let json = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;

        match serde_json::from_str::<ChatApiResponseOrError>(json).unwrap() {
            ChatApiResponseOrError::Error(err) => {
                assert_eq!(err.error.message, "Incorrect API key provided");
                assert_eq!(err.error.kind.as_deref(), Some("invalid_request_error"));
            }
            other => panic!("Expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_content_from_response() {
        let body = json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"category\": \"work\"}"},
                "finish_reason": "stop"
            }]
        });

        let content = content_from_response(StatusCode::OK, body).unwrap();
        assert_eq!(content, "{\"category\": \"work\"}");
    }

    #[test]
    fn test_error_body_is_mapped_by_status() {
        let body = json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        });

        let err = content_from_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(matches!(
            &err,
            AppError::Unauthorized(msg) if msg == "Chat API error: Incorrect API key provided"
        ));

        let body = json!({"error": {"message": "Rate limit reached"}});
        assert!(matches!(
            content_from_response(StatusCode::TOO_MANY_REQUESTS, body),
            Err(AppError::TooManyRequests)
        ));
    }

    #[test]
    fn test_response_without_choices() {
        let body = json!({"choices": []});

        let err = content_from_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(&err, AppError::Internal(_)));
        assert!(err.to_string().contains("No choices in response"));
    }

    #[test]
    fn test_response_with_null_content() {
        let body = json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": null},
                "finish_reason": "content_filter"
            }]
        });

        let err = content_from_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(&err, AppError::Internal(_)));
        assert!(err.to_string().contains("No content in chat response message"));
    }

    #[test]
    fn test_unknown_finish_reason() {
        let json = r#"{"index": 0, "message": {"role": "assistant", "content": null}, "finish_reason": "function_call"}"#;
        let choice = serde_json::from_str::<ChatChoice>(json).unwrap();
        assert_eq!(choice.finish_reason, Some(FinishReason::Other));
        assert!(choice.message.content.is_none());
    }
}
