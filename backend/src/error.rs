use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::extract::ExtractError;
use crate::sms::SmsError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no file uploaded")]
    MissingFile,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("every analysis stage failed")]
    AnalysisRefused,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sms(#[from] SmsError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<&'static str>) {
        match self {
            Self::MissingFile => (
                StatusCode::BAD_REQUEST,
                "MISSING_FILE",
                "파일이 없습니다.".to_string(),
                None,
            ),
            Self::Extract(ExtractError::Unsupported) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FILE",
                "지원하지 않는 파일 형식입니다.".to_string(),
                Some("PDF, DOCX, TXT, HWP 또는 이미지 파일을 업로드해주세요."),
            ),
            Self::Extract(ExtractError::Unreadable { format: "pdf", .. }) => (
                StatusCode::BAD_REQUEST,
                "PDF_PARSE_ERROR",
                "PDF 파일을 읽을 수 없습니다.".to_string(),
                Some("파일이 손상되었거나 암호화되어 있을 수 있습니다."),
            ),
            Self::Extract(ExtractError::Unreadable { .. }) => (
                StatusCode::BAD_REQUEST,
                "DOCUMENT_PARSE_ERROR",
                "문서 파일을 읽을 수 없습니다.".to_string(),
                Some("파일이 손상되었거나 암호화되어 있을 수 있습니다."),
            ),
            Self::Extract(ExtractError::ScannedPdf) => (
                StatusCode::BAD_REQUEST,
                "SCANNED_PDF",
                "스캔된 PDF입니다. 이미지로 변환 후 다시 업로드해주세요.".to_string(),
                Some("PDF의 각 페이지를 스크린샷으로 캡처하거나 이미지로 내보내기 후 업로드해주세요."),
            ),
            Self::Extract(ExtractError::Empty { .. }) => (
                StatusCode::BAD_REQUEST,
                "EMPTY_DOCUMENT",
                "문서에서 분석할 텍스트를 찾지 못했습니다.".to_string(),
                Some("내용이 있는 문서인지 확인하시거나 피해 경위를 직접 입력해주세요."),
            ),
            Self::AnalysisRefused => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ANALYSIS_REFUSED",
                "법률 문서의 내용이 민감하여 AI가 분석을 거부했습니다.".to_string(),
                Some("문서 내용을 직접 확인하시고 피해 경위를 직접 입력해주세요."),
            ),
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.clone(), None)
            }
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message.clone(), None),
            Self::Sms(SmsError::Rejected(_)) => (
                StatusCode::BAD_REQUEST,
                "SMS_FAILED",
                "문자 발송 실패".to_string(),
                None,
            ),
            Self::Sms(SmsError::Http(_) | SmsError::Signing) | Self::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERVER_ERROR",
                "서버 오류가 발생했습니다.".to_string(),
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, suggestion) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, code, "Request rejected");
        }

        let mut body = json!({
            "success": false,
            "error": code,
            "message": message,
        });
        if let Some(suggestion) = suggestion {
            body["suggestion"] = json!(suggestion);
        }

        (status, Json(body)).into_response()
    }
}
