mod analysis;
mod config;
mod db;
mod error;
mod extract;
mod llm;
mod models;
mod routes;
mod sms;

use std::sync::Arc;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use analysis::{PromptLadder, SummarizationEngine};
use config::AppConfig;
use routes::AppState;
use sms::SolapiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petition_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::init_db(&config.database_url).await?;
    tracing::info!("Database initialized");

    let provider = llm::build_provider(&config.llm)?;
    tracing::info!(
        provider = provider.name(),
        model = %config.llm.model,
        "LLM provider configured"
    );
    let mut analyzer = SummarizationEngine::new(provider, &config.analysis);
    if let Some(temperatures) = &config.analysis.stage_temperatures {
        analyzer = analyzer.with_ladder(PromptLadder::with_temperatures(temperatures)?);
        tracing::info!(?temperatures, "Prompt ladder temperatures overridden");
    }
    let sms = SolapiClient::new(&config.sms)?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        pool,
        analyzer: Arc::new(analyzer),
        sms: Arc::new(sms),
        config: Arc::new(config),
    };

    // The frontend is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Server running on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
