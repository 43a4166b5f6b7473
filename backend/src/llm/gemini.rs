use async_trait::async_trait;
use serde_json::{Value, json};

use super::{CompletionProvider, ImageInput, ProviderError, error_message, http_client};
use crate::config::LlmConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    max_output_tokens: u32,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: http_client(config)?,
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    async fn generate(
        &self,
        system: &str,
        parts: Value,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        let request_body = json!({
            "systemInstruction": {
                "parts": [{ "text": system }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": parts
                }
            ],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        });

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
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

        // Safety-blocked prompts come back without candidates; that is a refusal, not a transport fault.
        if raw_response
            .get("promptFeedback")
            .and_then(|feedback| feedback.get("blockReason"))
            .is_some()
        {
            return Ok(String::new());
        }

        let candidate_parts = raw_response
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|item| item.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|parts| parts.as_array())
            .ok_or_else(|| {
                ProviderError::Malformed("response does not contain candidate text".to_string())
            })?;

        Ok(candidate_parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|text| text.as_str()))
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        self.generate(system, json!([{ "text": user }]), temperature)
            .await
    }

    async fn complete_with_image(
        &self,
        system: &str,
        user: &str,
        image: &ImageInput,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        let parts = json!([
            { "text": user },
            {
                "inlineData": {
                    "mimeType": image.media_type,
                    "data": image.base64()
                }
            }
        ]);
        self.generate(system, parts, temperature).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;
    use crate::config::LlmProviderKind;

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            provider: LlmProviderKind::Gemini,
            api_key: "gm-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: server.uri(),
            max_output_tokens: 1500,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "gm-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "sys" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": { "temperature": 0.5 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "첫 문장. " }, { "text": "둘째 문장." }] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server)).unwrap();
        let text = provider.complete("sys", "hello", 0.5).await.unwrap();
        assert_eq!(text, "첫 문장. 둘째 문장.");
    }

    #[tokio::test]
    async fn image_is_sent_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "look" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "seen" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server)).unwrap();
        let image = ImageInput::new(vec![1, 2, 3], "image/jpeg");
        let text = provider
            .complete_with_image("sys", "look", &image, 0.3)
            .await
            .unwrap();
        assert_eq!(text, "seen");
    }

    #[tokio::test]
    async fn blocked_prompt_yields_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server)).unwrap();
        assert_eq!(provider.complete("sys", "hello", 0.3).await.unwrap(), "");
    }

    #[tokio::test]
    async fn missing_candidates_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "usage": {} })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(&config_for(&server)).unwrap();
        let error = provider.complete("sys", "hello", 0.3).await.unwrap_err();
        assert!(matches!(error, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn transport_error_does_not_expose_api_key() {
        let config = LlmConfig {
            provider: LlmProviderKind::Gemini,
            api_key: "SECRET-GEMINI-KEY".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            max_output_tokens: 1500,
            timeout: Duration::from_secs(5),
        };

        let provider = GeminiProvider::new(&config).unwrap();
        let error = provider.complete("sys", "hello", 0.3).await.unwrap_err();

        assert!(matches!(error, ProviderError::Http(_)));
        assert!(!error.to_string().contains("SECRET-GEMINI-KEY"));
        assert!(!format!("{error:?}").contains("SECRET-GEMINI-KEY"));
    }
}
