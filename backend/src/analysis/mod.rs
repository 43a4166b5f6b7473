//! Refusal-aware summarization of uploaded legal documents.
//!
//! The engine walks the [`PromptLadder`] one stage at a time and stops at the
//! first usable reply. Transport failures and refusals both just advance the
//! ladder. When every stage fails, text input degrades to a labelled verbatim
//! excerpt; image input has nothing to fall back to.

mod ladder;
mod refusal;

use std::{sync::Arc, time::Instant};

use tokio::time::error::Elapsed;
use tokio_util::sync::CancellationToken;

use crate::config::AnalysisConfig;
use crate::llm::{CompletionProvider, ImageInput, ProviderError};

pub use ladder::PromptLadder;
pub use refusal::RefusalClassifier;

pub const TRUNCATION_MARKER: &str = "...";
pub const FALLBACK_HEADER: &str = "[AI 자동 요약 실패 - 원본 텍스트]";
pub const FALLBACK_TRUNCATED_NOTICE: &str =
    "...\n\n(텍스트가 길어 일부만 표시됩니다. 필요한 부분을 복사하여 사용해주세요.)";
const IMAGE_PROMPT_HINT: &str = "(See attached document image)";

#[derive(Debug, Clone)]
pub enum AnalysisInput {
    Text { content: String },
    Image(ImageInput),
}

/// Verdict for a single stage.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success { summary: String },
    Refused,
    TransportError { detail: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Summarized { text: String, via_fallback: bool },
    Failed,
}

pub struct SummarizationEngine {
    provider: Arc<dyn CompletionProvider>,
    ladder: PromptLadder,
    classifier: RefusalClassifier,
    limits: AnalysisConfig,
}

impl SummarizationEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &AnalysisConfig) -> Self {
        let classifier = match &config.refusal_markers {
            Some(markers) => RefusalClassifier::new(markers, config.min_summary_chars),
            None => RefusalClassifier::with_default_markers(config.min_summary_chars),
        };

        Self {
            provider,
            ladder: PromptLadder::default(),
            classifier,
            limits: config.clone(),
        }
    }

    pub fn with_ladder(mut self, ladder: PromptLadder) -> Self {
        self.ladder = ladder;
        self
    }

    #[cfg(test)]
    pub fn ladder(&self) -> &PromptLadder {
        &self.ladder
    }

    pub async fn summarize(
        &self,
        input: &AnalysisInput,
        cancel: &CancellationToken,
    ) -> AnalysisResult {
        let prepared = match input {
            AnalysisInput::Text { content } => {
                Some(truncate_for_prompt(content, self.limits.max_input_chars))
            }
            AnalysisInput::Image(_) => None,
        };
        let total_stages = self.ladder.len();

        for stage in self.ladder.stages() {
            let attempt = stage.stage_index + 1;
            if cancel.is_cancelled() {
                tracing::warn!(attempt, total_stages, "Analysis cancelled before stage");
                return AnalysisResult::Failed;
            }

            let user_prompt = match &prepared {
                Some(text) => format!("{}{}", stage.user_preamble, text),
                None => format!("{}{}", stage.user_preamble, IMAGE_PROMPT_HINT),
            };
            let call = async {
                match input {
                    AnalysisInput::Text { .. } => {
                        self.provider
                            .complete(
                                &stage.system_instruction,
                                &user_prompt,
                                stage.sampling_temperature,
                            )
                            .await
                    }
                    AnalysisInput::Image(image) => {
                        self.provider
                            .complete_with_image(
                                &stage.system_instruction,
                                &user_prompt,
                                image,
                                stage.sampling_temperature,
                            )
                            .await
                    }
                }
            };

            tracing::debug!(
                attempt,
                total_stages,
                provider = self.provider.name(),
                temperature = stage.sampling_temperature,
                "Analysis stage starting"
            );
            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(attempt, total_stages, "Analysis cancelled during stage");
                    return AnalysisResult::Failed;
                }
                result = tokio::time::timeout(self.limits.call_timeout, call) => {
                    self.classify(result)
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                AnalysisOutcome::Success { summary } => {
                    tracing::info!(attempt, total_stages, elapsed_ms, "Analysis stage succeeded");
                    return AnalysisResult::Summarized {
                        text: summary,
                        via_fallback: false,
                    };
                }
                AnalysisOutcome::Refused => {
                    tracing::warn!(attempt, total_stages, elapsed_ms, "Analysis stage refused");
                }
                AnalysisOutcome::TransportError { detail } => {
                    tracing::warn!(
                        attempt,
                        total_stages,
                        elapsed_ms,
                        "Analysis stage failed: {}",
                        detail
                    );
                }
            }
        }

        match prepared {
            Some(text) if text.chars().count() > self.limits.fallback_min_chars => {
                tracing::warn!(total_stages, "All stages failed, returning source excerpt");
                AnalysisResult::Summarized {
                    text: fallback_excerpt(&text, self.limits.excerpt_chars),
                    via_fallback: true,
                }
            }
            _ => {
                tracing::warn!(total_stages, "All stages failed, no fallback available");
                AnalysisResult::Failed
            }
        }
    }

    fn classify(&self, result: Result<Result<String, ProviderError>, Elapsed>) -> AnalysisOutcome {
        let reply = match result {
            Ok(Ok(reply)) => reply,
            Ok(Err(error)) => {
                return AnalysisOutcome::TransportError {
                    detail: error.to_string(),
                };
            }
            Err(_) => {
                return AnalysisOutcome::TransportError {
                    detail: ProviderError::Timeout(self.limits.call_timeout.as_secs())
                        .to_string(),
                };
            }
        };

        if self.classifier.is_usable(&reply) {
            AnalysisOutcome::Success { summary: reply }
        } else {
            tracing::debug!(
                reply_chars = reply.chars().count(),
                min_chars = self.classifier.min_chars(),
                "Reply rejected as refusal or too short"
            );
            AnalysisOutcome::Refused
        }
    }
}

/// Caps text at `max_chars` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

pub fn fallback_excerpt(text: &str, excerpt_chars: usize) -> String {
    let excerpt: String = text.chars().take(excerpt_chars).collect();
    let notice = if text.chars().count() > excerpt_chars {
        FALLBACK_TRUNCATED_NOTICE
    } else {
        ""
    };
    format!("{}\n\n{}{}", FALLBACK_HEADER, excerpt, notice)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::llm::testing::{Scripted, ScriptedProvider};

    const REFUSAL: &str = "죄송합니다, 처리할 수 없습니다";

    fn engine(provider: &ScriptedProvider) -> SummarizationEngine {
        SummarizationEngine::new(Arc::new(provider.clone()), &AnalysisConfig::default())
    }

    fn narrative(chars: usize) -> String {
        "피고인은 피해자에게 지속적으로 연락하며 협박하였다 "
            .chars()
            .cycle()
            .take(chars)
            .collect()
    }

    fn text(content: String) -> AnalysisInput {
        AnalysisInput::Text { content }
    }

    #[tokio::test]
    async fn first_usable_stage_wins() {
        let summary: String = "가해자가 저를 폭행했습니다. ".chars().cycle().take(120).collect();
        let provider = ScriptedProvider::replying(&[summary.as_str()]);
        let engine = engine(&provider);

        let result = engine
            .summarize(&text(narrative(9000)), &CancellationToken::new())
            .await;

        assert_eq!(
            result,
            AnalysisResult::Summarized {
                text: summary.clone(),
                via_fallback: false
            }
        );
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn long_text_is_truncated_for_every_stage() {
        let provider = ScriptedProvider::replying(&[REFUSAL, REFUSAL, REFUSAL]);
        let engine = engine(&provider);
        let content = narrative(9000);
        let expected_body = format!(
            "{}{}",
            content.chars().take(8000).collect::<String>(),
            TRUNCATION_MARKER
        );

        engine
            .summarize(&text(content.clone()), &CancellationToken::new())
            .await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        for (call, stage) in calls.iter().zip(engine.ladder().stages()) {
            let body = call.user.strip_prefix(stage.user_preamble.as_str()).unwrap();
            assert_eq!(body, expected_body);
            assert!(!call.user.contains(&content));
        }
    }

    #[tokio::test]
    async fn refusals_on_every_stage_fall_back_to_excerpt() {
        let provider = ScriptedProvider::replying(&[REFUSAL, REFUSAL, REFUSAL]);
        let engine = engine(&provider);
        let content = narrative(200);

        let result = engine
            .summarize(&text(content.clone()), &CancellationToken::new())
            .await;

        let AnalysisResult::Summarized { text, via_fallback } = result else {
            panic!("expected fallback excerpt");
        };
        assert!(via_fallback);
        assert!(text.starts_with(FALLBACK_HEADER));
        assert!(text.contains(&content));
        assert!(!text.contains(FALLBACK_TRUNCATED_NOTICE));
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn excerpt_is_bounded() {
        let provider = ScriptedProvider::replying(&[REFUSAL, REFUSAL, REFUSAL]);
        let engine = engine(&provider);
        let content = format!("{}{}", "가".repeat(1000), "나".repeat(4000));

        let result = engine
            .summarize(&text(content), &CancellationToken::new())
            .await;

        let AnalysisResult::Summarized { text, via_fallback } = result else {
            panic!("expected fallback excerpt");
        };
        assert!(via_fallback);
        assert!(text.contains(&"가".repeat(1000)));
        assert!(!text.contains('나'));
        assert!(text.ends_with(FALLBACK_TRUNCATED_NOTICE));
    }

    #[tokio::test]
    async fn short_text_without_success_fails() {
        let provider = ScriptedProvider::replying(&[REFUSAL, REFUSAL, REFUSAL]);
        let engine = engine(&provider);

        let result = engine
            .summarize(&text(narrative(40)), &CancellationToken::new())
            .await;

        assert_eq!(result, AnalysisResult::Failed);
    }

    #[tokio::test]
    async fn image_transport_errors_fail_without_fallback() {
        let provider = ScriptedProvider::new(vec![Scripted::Fail, Scripted::Fail]);
        let ladder = PromptLadder::new(PromptLadder::default().stages()[..2].to_vec()).unwrap();
        let engine = engine(&provider).with_ladder(ladder);
        let input = AnalysisInput::Image(ImageInput::new(vec![0xFF, 0xD8], "image/jpeg"));

        let result = engine.summarize(&input, &CancellationToken::new()).await;

        assert_eq!(result, AnalysisResult::Failed);
        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|call| call.with_image));
        assert!(calls[0].user.ends_with(IMAGE_PROMPT_HINT));
    }

    #[tokio::test]
    async fn later_stage_runs_only_after_earlier_failures() {
        let success: String = "피고인이 저를 때리고 휴대폰을 빼앗았습니다. ".repeat(3);
        let provider = ScriptedProvider::new(vec![
            Scripted::Reply(REFUSAL.to_string()),
            Scripted::Fail,
            Scripted::Reply(success.clone()),
        ]);
        let engine = engine(&provider);

        let result = engine
            .summarize(&text(narrative(500)), &CancellationToken::new())
            .await;

        assert_eq!(
            result,
            AnalysisResult::Summarized {
                text: success,
                via_fallback: false
            }
        );
        let temperatures: Vec<f64> = provider.calls().iter().map(|c| c.temperature).collect();
        assert_eq!(temperatures, vec![0.3, 0.5, 0.7]);
        let systems: Vec<String> = provider.calls().into_iter().map(|c| c.system).collect();
        let expected: Vec<String> = engine
            .ladder()
            .stages()
            .iter()
            .map(|s| s.system_instruction.clone())
            .collect();
        assert_eq!(systems, expected);
    }

    #[tokio::test]
    async fn too_short_reply_advances_ladder() {
        let usable = "가해자가 퇴근길에 저를 따라와 위협했습니다. 이후 여러 차례 연락했습니다.";
        let provider = ScriptedProvider::replying(&["요약: 폭행", usable]);
        let engine = engine(&provider);

        let result = engine
            .summarize(&text(narrative(300)), &CancellationToken::new())
            .await;

        assert_eq!(
            result,
            AnalysisResult::Summarized {
                text: usable.to_string(),
                via_fallback: false
            }
        );
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn timed_out_stage_is_a_transport_error() {
        let usable = "가해자가 퇴근길에 저를 따라와 위협했습니다. 이후 여러 차례 연락했습니다.";
        let provider = ScriptedProvider::new(vec![Scripted::Hang, Scripted::Reply(usable.to_string())]);
        let config = AnalysisConfig {
            call_timeout: Duration::from_millis(50),
            ..AnalysisConfig::default()
        };
        let engine = SummarizationEngine::new(Arc::new(provider.clone()), &config);

        let result = engine
            .summarize(&text(narrative(300)), &CancellationToken::new())
            .await;

        assert_eq!(
            result,
            AnalysisResult::Summarized {
                text: usable.to_string(),
                via_fallback: false
            }
        );
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_call() {
        let provider = ScriptedProvider::replying(&[REFUSAL]);
        let engine = engine(&provider);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine.summarize(&text(narrative(500)), &cancel).await;

        assert_eq!(result, AnalysisResult::Failed);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn cancellation_mid_call_skips_fallback() {
        let provider = ScriptedProvider::new(vec![Scripted::Hang]);
        let engine = engine(&provider);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = engine.summarize(&text(narrative(500)), &cancel).await;

        assert_eq!(result, AnalysisResult::Failed);
        assert_eq!(provider.calls().len(), 1);
    }

    #[test]
    fn truncation_keeps_short_text_intact() {
        assert_eq!(truncate_for_prompt("짧은 글", 10), "짧은 글");
        assert_eq!(truncate_for_prompt("가나다라", 2), "가나...");
    }
}
