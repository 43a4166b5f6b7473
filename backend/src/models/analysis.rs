use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub summary: String,
    pub via_fallback: bool,
}
