//! OpenAI-compatible chat completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerativeModel, ModelError};
use crate::instruction::Instruction;

/// Longest error body kept from a failed model call
const MAX_ERROR_BODY: usize = 200;

pub struct ChatCompletionsModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionsModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl GenerativeModel for ChatCompletionsModel {
    async fn generate(&self, instruction: &Instruction) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &instruction.system,
                },
                ChatMessage {
                    role: "user",
                    content: &instruction.user,
                },
            ],
            temperature: 0.7,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout
            } else {
                ModelError::Unavailable(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status,
                body: body.trim().chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let completion = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ModelError::BadResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::BadResponse("response has no choices".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, http::HeaderMap, routing::post};
    use serde_json::{Value, json};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn instruction() -> Instruction {
        Instruction {
            system: "answer in JSON".to_string(),
            user: "plan dinner".to_string(),
        }
    }

    #[tokio::test]
    async fn test_returns_first_choice_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer secret");
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["messages"][1]["content"], "plan dinner");
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "{\"meals\": []}"}}]
                }))
            }),
        );
        let base_url = serve(router).await;

        let model = ChatCompletionsModel::new(
            base_url,
            Some("secret".to_string()),
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(model.generate(&instruction()).await.unwrap(), "{\"meals\": []}");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let base_url = serve(router).await;

        let model =
            ChatCompletionsModel::new(base_url, None, "test-model", Duration::from_secs(5)).unwrap();

        match model.generate(&instruction()).await {
            Err(ModelError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let model = ChatCompletionsModel::new(
            format!("http://{}", addr),
            None,
            "test-model",
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(matches!(
            model.generate(&instruction()).await,
            Err(ModelError::Unavailable(_))
        ));
    }
}
