use super::{
    config::CompletionConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{json, Value};
use std::time::Duration;

/// A language model that can be asked for a JSON object.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// One synchronous completion in JSON mode. `Ok(None)` means the service
    /// answered without any message content.
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Option<String>>;
}

/// Talks to the OpenAI chat completions API, or anything that mimics it.
pub struct OpenAiClient {
    http: Client,
    config: CompletionConfig,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    fn request_body(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "response_format": { "type": "json_object" },
            "temperature": self.config.temperature,
        })
    }
}

fn message_content(body: &Value) -> Option<String> {
    body.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.to_string())
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(model = %self.config.model, "requesting completion");
        let res = self
            .http
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .json(&self.request_body(system_prompt, user_prompt))
            .send()
            .await?;

        let status = res.status();
        let body: Value = res.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let msg = body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("no error message");
            return Err(Error::Upstream(format!(
                "Completion service error ({status}): {msg}"
            )));
        }

        Ok(message_content(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new(CompletionConfig {
            api_key: "sk-test".into(),
            base_url: "http://localhost:1".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_request_body_is_json_mode() {
        let body = client().request_body("sys", "usr");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_message_content() {
        let body = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "{\"summary\": \"x\"}" } }
            ]
        });
        assert_eq!(
            message_content(&body).as_deref(),
            Some("{\"summary\": \"x\"}")
        );
        assert_eq!(message_content(&json!({ "choices": [] })), None);
        let blank = json!({ "choices": [{ "message": { "content": "  " } }] });
        assert_eq!(message_content(&blank), None);
    }
}
