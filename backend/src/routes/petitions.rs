use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use super::AppState;
use crate::db;
use crate::error::ApiError;
use crate::models::{CreatePetition, CreatePetitionResponse, PetitionQuery};

pub fn petition_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(find_petition_by_order).post(create_petition))
        .route("/{petition_id}", get(get_petition))
}

async fn create_petition(
    State(state): State<AppState>,
    Json(input): Json<CreatePetition>,
) -> Result<impl IntoResponse, ApiError> {
    if input.content.trim().is_empty() {
        return Err(ApiError::BadRequest("탄원서 내용이 비어 있습니다.".to_string()));
    }

    let id = db::insert_petition(&state.pool, &input)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                ApiError::BadRequest("이미 저장된 주문번호입니다.".to_string())
            } else {
                ApiError::from(error)
            }
        })?;
    tracing::info!(petition_id = id, "Petition saved");

    Ok((
        StatusCode::CREATED,
        Json(CreatePetitionResponse { success: true, id }),
    ))
}

async fn get_petition(
    State(state): State<AppState>,
    Path(petition_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let petition = db::fetch_petition(&state.pool, petition_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Petition {} not found", petition_id)))?;
    Ok(Json(petition))
}

async fn find_petition_by_order(
    State(state): State<AppState>,
    Query(query): Query<PetitionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = query
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("order_id is required".to_string()))?;

    let petition = db::fetch_petition_by_order_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Petition for order {} not found", order_id))
        })?;
    Ok(Json(petition))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db_error| db_error.is_unique_violation())
}
