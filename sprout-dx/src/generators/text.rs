//! OpenAI-compatible chat-completions client

use crate::config::LlmConfig;
use crate::types::{GeneratorError, TextGenerator, TextRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text generator backed by `POST {base_url}/chat/completions`
pub struct OpenAiTextGenerator {
    http_client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiTextGenerator {
    pub fn new(config: LlmConfig, timeout: Duration) -> Result<Self, GeneratorError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::Unavailable(e.to_string()))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn body<'a>(&'a self, request: &'a TextRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiTextGenerator {
    fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    async fn generate(&self, request: &TextRequest) -> Result<String, GeneratorError> {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Err(GeneratorError::Unavailable("LLM API key not configured".to_string()));
        };

        debug!(model = %self.config.model, max_tokens = request.max_tokens, "Calling text generator");

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| GeneratorError::Failure(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Failure(format!(
                "text generator returned {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Failure(format!("malformed response: {}", e)))?;
        first_content(parsed)
    }
}

fn first_content(response: ChatResponse) -> Result<String, GeneratorError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| GeneratorError::Failure("empty completion".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(api_key: Option<&str>) -> OpenAiTextGenerator {
        let config = LlmConfig {
            api_key: api_key.map(str::to_string),
            base_url: "https://llm.example/v1/".to_string(),
            ..Default::default()
        };
        OpenAiTextGenerator::new(config, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_availability_follows_api_key() {
        assert!(!generator(None).is_available());
        assert!(!generator(Some("  ")).is_available());
        assert!(generator(Some("sk-test")).is_available());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        assert_eq!(
            generator(None).endpoint(),
            "https://llm.example/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let g = generator(Some("sk-test"));
        let request = TextRequest {
            system: "You are helpful".to_string(),
            prompt: "Hello".to_string(),
            max_tokens: 123,
        };
        let json = serde_json::to_value(g.body(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 123);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_first_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "  advice  "}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(response).unwrap(), "advice");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(first_content(empty).is_err());
    }

    #[tokio::test]
    async fn test_generate_without_key_is_unavailable() {
        let request = TextRequest {
            system: String::new(),
            prompt: "x".to_string(),
            max_tokens: 10,
        };
        let err = generator(None).generate(&request).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Unavailable(_)));
    }
}
