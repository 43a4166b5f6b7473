use std::{str::FromStr, time::Duration};

use anyhow::{Context, anyhow};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SOLAPI_BASE_URL: &str = "https://api.solapi.com";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const MIN_LLM_TIMEOUT_SECS: u64 = 5;
pub const MAX_LLM_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_MAX_OUTPUT_TOKENS: u32 = 1500;
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8000;
pub const DEFAULT_MIN_SUMMARY_CHARS: usize = 30;
pub const DEFAULT_FALLBACK_MIN_CHARS: usize = 100;
pub const DEFAULT_EXCERPT_CHARS: usize = 1000;
pub const DEFAULT_MIN_EXTRACTED_CHARS: usize = 50;
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Gemini,
}

impl FromStr for LlmProviderKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(anyhow!("Unknown LLM_PROVIDER: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

/// Limits applied by the summarization engine and the upload handler.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub max_input_chars: usize,
    pub min_summary_chars: usize,
    pub fallback_min_chars: usize,
    pub excerpt_chars: usize,
    pub min_extracted_chars: usize,
    /// Replaces the built-in refusal markers when set.
    pub refusal_markers: Option<Vec<String>>,
    /// One temperature per default ladder stage.
    pub stage_temperatures: Option<Vec<f64>>,
    pub call_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            min_summary_chars: DEFAULT_MIN_SUMMARY_CHARS,
            fallback_min_chars: DEFAULT_FALLBACK_MIN_CHARS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            min_extracted_chars: DEFAULT_MIN_EXTRACTED_CHARS,
            refusal_markers: None,
            stage_temperatures: None,
            call_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    pub from_number: String,
    pub to_number: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub upload_max_bytes: usize,
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    pub sms: SmsConfig,
}

impl AppConfig {
    /// Reads the whole configuration once at startup.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource(lookup);

        let provider = env.or("LLM_PROVIDER", "openai").parse::<LlmProviderKind>()?;
        let timeout_secs = env
            .parse("LLM_TIMEOUT_SECS")
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS)
            .clamp(MIN_LLM_TIMEOUT_SECS, MAX_LLM_TIMEOUT_SECS);
        let timeout = Duration::from_secs(timeout_secs);
        let max_output_tokens = env
            .parse("LLM_MAX_OUTPUT_TOKENS")
            .unwrap_or(DEFAULT_LLM_MAX_OUTPUT_TOKENS);

        let llm = match provider {
            LlmProviderKind::OpenAi => LlmConfig {
                provider,
                api_key: env.required("OPENAI_API_KEY")?,
                model: env.or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
                base_url: env.or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                max_output_tokens,
                timeout,
            },
            LlmProviderKind::Gemini => LlmConfig {
                provider,
                api_key: env.required("GEMINI_API_KEY")?,
                model: env.or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: env.or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
                max_output_tokens,
                timeout,
            },
        };

        let analysis = AnalysisConfig {
            max_input_chars: env
                .parse("ANALYSIS_MAX_INPUT_CHARS")
                .filter(|value| *value >= 1000)
                .unwrap_or(DEFAULT_MAX_INPUT_CHARS),
            min_summary_chars: env
                .parse("ANALYSIS_MIN_SUMMARY_CHARS")
                .unwrap_or(DEFAULT_MIN_SUMMARY_CHARS),
            fallback_min_chars: env
                .parse("ANALYSIS_FALLBACK_MIN_CHARS")
                .unwrap_or(DEFAULT_FALLBACK_MIN_CHARS),
            excerpt_chars: env
                .parse("ANALYSIS_EXCERPT_CHARS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_EXCERPT_CHARS),
            min_extracted_chars: env
                .parse("ANALYSIS_MIN_EXTRACTED_CHARS")
                .unwrap_or(DEFAULT_MIN_EXTRACTED_CHARS),
            refusal_markers: env
                .get("ANALYSIS_REFUSAL_MARKERS")
                .map(|raw| parse_marker_list(&raw))
                .filter(|markers| !markers.is_empty()),
            stage_temperatures: env
                .get("ANALYSIS_STAGE_TEMPERATURES")
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_temperature_list(&raw))
                .transpose()?,
            call_timeout: timeout,
        };

        let sms = SmsConfig {
            api_key: env.required("SOLAPI_API_KEY")?,
            api_secret: env.required("SOLAPI_API_SECRET")?,
            base_url: env.or("SOLAPI_BASE_URL", DEFAULT_SOLAPI_BASE_URL),
            from_number: env.required("SMS_FROM_NUMBER")?,
            to_number: env.required("SMS_TO_NUMBER")?,
        };

        Ok(Self {
            bind_addr: env.or("BIND_ADDR", DEFAULT_BIND_ADDR),
            database_url: env.required("DATABASE_URL")?,
            upload_max_bytes: env
                .parse("UPLOAD_MAX_BYTES")
                .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES),
            llm,
            analysis,
            sms,
        })
    }
}

struct EnvSource<F>(F);

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn required(&self, key: &str) -> Result<String, anyhow::Error> {
        self.get(key)
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("{} is not configured", key))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|raw| raw.trim().parse::<T>().ok())
    }
}

fn parse_marker_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|marker| !marker.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_temperature_list(raw: &str) -> Result<Vec<f64>, anyhow::Error> {
    raw.split(',')
        .map(str::trim)
        .map(|value| {
            value
                .parse::<f64>()
                .with_context(|| format!("Invalid ANALYSIS_STAGE_TEMPERATURES entry: {:?}", value))
        })
        .collect()
}
