mod gemini;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProviderKind};

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider call timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        // Logged provider errors never include the request URL.
        Self::Http(error.without_url())
    }
}

/// Image payload forwarded to a vision-capable model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    pub fn base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// A chat-completion backend. Both calls return the model's text or a
/// [`ProviderError`]; judging whether the text is usable is left to the caller.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, ProviderError>;

    async fn complete_with_image(
        &self,
        system: &str,
        user: &str,
        image: &ImageInput,
        temperature: f64,
    ) -> Result<String, ProviderError>;
}

pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>, anyhow::Error> {
    let provider: Arc<dyn CompletionProvider> = match config.provider {
        LlmProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        LlmProviderKind::Gemini => Arc::new(GeminiProvider::new(config)?),
    };
    Ok(provider)
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|error| anyhow::anyhow!("Failed to build LLM HTTP client: {}", error))
}

/// Pulls a human-readable message out of an error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::{CompletionProvider, ImageInput, ProviderError};

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub system: String,
        pub user: String,
        pub temperature: f64,
        pub with_image: bool,
    }

    pub enum Scripted {
        Reply(String),
        Fail,
        Hang,
    }

    /// Replays a fixed script of replies and records every call it receives.
    #[derive(Clone, Default)]
    pub struct ScriptedProvider {
        script: Arc<Mutex<VecDeque<Scripted>>>,
        calls: Arc<Mutex<Vec<RecordedCall>>>,
    }

    impl ScriptedProvider {
        pub fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                calls: Arc::default(),
            }
        }

        pub fn replying(replies: &[&str]) -> Self {
            Self::new(
                replies
                    .iter()
                    .map(|reply| Scripted::Reply(reply.to_string()))
                    .collect(),
            )
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        async fn next(&self, call: RecordedCall) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(call);
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Scripted::Reply(text)) => Ok(text),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
                Some(Scripted::Fail) | None => Err(ProviderError::Status {
                    status: 503,
                    message: "scripted failure".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(
            &self,
            system: &str,
            user: &str,
            temperature: f64,
        ) -> Result<String, ProviderError> {
            self.next(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
                temperature,
                with_image: false,
            })
            .await
        }

        async fn complete_with_image(
            &self,
            system: &str,
            user: &str,
            _image: &ImageInput,
            temperature: f64,
        ) -> Result<String, ProviderError> {
            self.next(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
                temperature,
                with_image: true,
            })
            .await
        }
    }
}
