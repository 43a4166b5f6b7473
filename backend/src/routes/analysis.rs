use axum::{
    Json, Router,
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
};
use tokio_util::sync::CancellationToken;

use super::AppState;
use crate::analysis::AnalysisResult;
use crate::error::ApiError;
use crate::extract::{self, DocumentFormat, ExtractError};
use crate::models::AnalysisResponse;

struct Upload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/analyze-document", post(analyze_document))
}

async fn analyze_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let upload = upload
        .filter(|upload| !upload.bytes.is_empty())
        .ok_or(ApiError::MissingFile)?;
    let format = DocumentFormat::detect(&upload.file_name, upload.content_type.as_deref())
        .ok_or(ExtractError::Unsupported)?;

    tracing::info!(
        file_name = %upload.file_name,
        format = format.label(),
        bytes = upload.bytes.len(),
        "Document received for analysis"
    );

    let input = extract::prepare_input(
        format,
        upload.bytes,
        state.config.analysis.min_extracted_chars,
    )
    .await?;

    // Dropping the handler future (client gone) cancels the ladder.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match state.analyzer.summarize(&input, &cancel).await {
        AnalysisResult::Summarized { text, via_fallback } => Ok(Json(AnalysisResponse {
            success: true,
            summary: text,
            via_fallback,
        })),
        AnalysisResult::Failed => Err(ApiError::AnalysisRefused),
    }
}
