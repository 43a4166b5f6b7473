use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Petition {
    pub id: i64,
    pub order_id: Option<String>,
    pub author_name: Option<String>,
    pub user_type: Option<String>,
    pub crime_types: Option<String>,
    pub petition_type: Option<String>,
    pub content: String,
    pub plan: Option<String>,
    pub price: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePetition {
    pub order_id: Option<String>,
    pub author_name: Option<String>,
    pub user_type: Option<String>,
    pub crime_types: Option<String>,
    pub petition_type: Option<String>,
    pub content: String,
    pub plan: Option<String>,
    pub price: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePetitionResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct PetitionQuery {
    pub order_id: Option<String>,
}
