use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Timelike, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde_json::{Value, json};
use sha2::Sha256;

use crate::config::SmsConfig;
use crate::models::NotificationRequest;

type HmacSha256 = Hmac<Sha256>;

const SERVICE_TAG: &str = "[진심의무게]";
const KST_OFFSET_SECS: i32 = 9 * 3600;
const SEND_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid signing key")]
    Signing,

    #[error("SMS provider rejected the message: {0}")]
    Rejected(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsReceipt {
    pub group_id: String,
}

/// Solapi `messages/v4/send` client. Every message goes to the configured operator number.
pub struct SolapiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    api_secret: String,
    from_number: String,
    to_number: String,
}

impl SolapiClient {
    pub fn new(config: &SmsConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/messages/v4/send", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            from_number: config.from_number.clone(),
            to_number: config.to_number.clone(),
        })
    }

    pub async fn send(&self, text: &str) -> Result<SmsReceipt, SmsError> {
        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let salt = hex::encode(rand::rng().random::<[u8; 16]>());
        let authorization = authorization_header(&self.api_key, &self.api_secret, &date, &salt)?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&json!({
                "message": {
                    "to": self.to_number,
                    "from": self.from_number,
                    "text": text,
                }
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let result: Value =
            serde_json::from_str(&body).unwrap_or_else(|_| json!({ "raw_body": body }));
        tracing::info!(status = %status, "Solapi response: {}", result);

        match result.get("groupId").and_then(|id| id.as_str()) {
            Some(group_id) => Ok(SmsReceipt {
                group_id: group_id.to_string(),
            }),
            None => Err(SmsError::Rejected(result)),
        }
    }
}

pub fn sign(api_secret: &str, date: &str, salt: &str) -> Result<String, SmsError> {
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes()).map_err(|_| SmsError::Signing)?;
    mac.update(date.as_bytes());
    mac.update(salt.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn authorization_header(
    api_key: &str,
    api_secret: &str,
    date: &str,
    salt: &str,
) -> Result<String, SmsError> {
    let signature = sign(api_secret, date, salt)?;
    Ok(format!(
        "HMAC-SHA256 apiKey={}, date={}, salt={}, signature={}",
        api_key, date, salt, signature
    ))
}

pub fn compose_message(request: &NotificationRequest, now: DateTime<Utc>) -> String {
    let timestamp = filled(&request.timestamp)
        .map(str::to_string)
        .unwrap_or_else(|| ko_kr_timestamp(now));
    let name = filled(&request.name).unwrap_or("익명");

    if request.is_review_request() {
        format!(
            "{} 🔔 전문가 검토 신청!\n\n\
             📌 상품: {}\n\
             💰 결제액: {}원\n\
             ⏰ 응답기한: {}\n\n\
             👤 작성자: {}\n\
             📧 이메일: {}\n\
             📱 연락처: {}\n\n\
             ⚡ 기한 내 검토 완료해주세요!\n\
             🕐 {}",
            SERVICE_TAG,
            filled(&request.plan).unwrap_or("미지정"),
            filled(&request.price).unwrap_or("0"),
            filled(&request.deadline).unwrap_or("확인필요"),
            name,
            filled(&request.email).unwrap_or("미입력"),
            filled(&request.phone).unwrap_or("미입력"),
            timestamp
        )
    } else {
        let user_type = if request.user_type.as_deref() == Some("victim") {
            "피해자"
        } else {
            "가족/지인"
        };
        format!(
            "{} 새 탄원서 완성!\n\n\
             작성자: {}\n\
             유형: {}\n\
             죄명: {}\n\n\
             시간: {}",
            SERVICE_TAG,
            name,
            user_type,
            filled(&request.crime_types).unwrap_or("미지정"),
            timestamp
        )
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Formats like a `ko-KR` locale string in Korean time, e.g. `2024. 1. 5. 오후 3:04:05`.
fn ko_kr_timestamp(now: DateTime<Utc>) -> String {
    let Some(kst) = FixedOffset::east_opt(KST_OFFSET_SECS) else {
        return now.to_rfc3339();
    };
    let local = now.with_timezone(&kst);
    let (is_pm, hour) = local.hour12();
    format!(
        "{}. {}. {}. {} {}:{:02}:{:02}",
        local.year(),
        local.month(),
        local.day(),
        if is_pm { "오후" } else { "오전" },
        hour,
        local.minute(),
        local.second()
    )
}
