//! OpenAI chat-completions driver.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::domain::error::ProviderError;
use crate::domain::models::GenerateOptions;
use crate::domain::ports::ProviderDriver;

pub struct OpenAiDriver {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiDriver {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl ProviderDriver for OpenAiDriver {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": options.model,
                "temperature": options.temperature,
                "max_tokens": options.max_tokens,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::QuotaExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError { status: status.as_u16(), message: body });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_parses_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"the answer is 42"}}]}"#)
            .create_async()
            .await;

        let driver = OpenAiDriver::new("test-key").with_base_url(server.url());
        let result = driver.generate("what is the answer?", &GenerateOptions::default()).await.unwrap();

        assert_eq!(result, "the answer is 42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_maps_rate_limit_to_quota_exceeded() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/v1/chat/completions").with_status(429).create_async().await;

        let driver = OpenAiDriver::new("test-key").with_base_url(server.url());
        let result = driver.generate("prompt", &GenerateOptions::default()).await;

        assert!(matches!(result, Err(ProviderError::QuotaExceeded)));
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let driver = OpenAiDriver::new("test-key").with_base_url(server.url());
        let result = driver.generate("prompt", &GenerateOptions::default()).await;

        match result {
            Err(ProviderError::ApiError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal error");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }
}
