use async_trait::async_trait;
use serde_json::{Value, json};

use super::{CompletionProvider, ImageInput, ProviderError, error_message, http_client};
use crate::config::LlmConfig;

pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: http_client(config)?,
            url: format!(
                "{}/v1/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_output_tokens,
        })
    }

    async fn send(&self, messages: Value, temperature: f64) -> Result<String, ProviderError> {
        let request_body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let raw_response: Value = serde_json::from_str(&body)
            .map_err(|error| ProviderError::Malformed(error.to_string()))?;

        // An absent message body is reported as empty text, which never passes the length gate.
        Ok(raw_response
            .get("choices")
            .and_then(|choices| choices.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        let messages = json!([
            { "role": "system", "content": system },
            { "role": "user", "content": user },
        ]);
        self.send(messages, temperature).await
    }

    async fn complete_with_image(
        &self,
        system: &str,
        user: &str,
        image: &ImageInput,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        let data_url = format!("data:{};base64,{}", image.media_type, image.base64());
        let messages = json!([
            { "role": "system", "content": system },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": user },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ]
            },
        ]);
        self.send(messages, temperature).await
    }
}
