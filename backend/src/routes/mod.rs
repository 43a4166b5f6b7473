pub mod analysis;
pub mod notifications;
pub mod petitions;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, response::IntoResponse, routing::get};
use sqlx::MySqlPool;

use crate::analysis::SummarizationEngine;
use crate::config::AppConfig;
use crate::sms::SolapiClient;

pub use analysis::analysis_routes;
pub use notifications::notification_routes;
pub use petitions::petition_routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub analyzer: Arc<SummarizationEngine>,
    pub sms: Arc<SolapiClient>,
    pub config: Arc<AppConfig>,
}

pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(analysis_routes())
        .merge(notification_routes())
        .nest("/petitions", petition_routes())
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(state.config.upload_max_bytes))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "healthy"}))
}
