use chrono::Utc;
use sqlx::MySqlPool;

use crate::models::{CreatePetition, Petition};

const PETITION_COLUMNS: &str = r#"
    SELECT
        id,
        order_id,
        author_name,
        user_type,
        crime_types,
        petition_type,
        content,
        plan,
        price,
        email,
        phone,
        created_at
    FROM petitions
"#;

pub async fn insert_petition(pool: &MySqlPool, input: &CreatePetition) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO petitions (
            order_id,
            author_name,
            user_type,
            crime_types,
            petition_type,
            content,
            plan,
            price,
            email,
            phone,
            created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(
        input
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty()),
    )
    .bind(&input.author_name)
    .bind(&input.user_type)
    .bind(&input.crime_types)
    .bind(&input.petition_type)
    .bind(input.content.trim())
    .bind(&input.plan)
    .bind(input.price)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_id() as i64)
}

pub async fn fetch_petition(pool: &MySqlPool, id: i64) -> Result<Option<Petition>, sqlx::Error> {
    let sql = format!("{} WHERE id = ?", PETITION_COLUMNS);
    sqlx::query_as::<_, Petition>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_petition_by_order_id(
    pool: &MySqlPool,
    order_id: &str,
) -> Result<Option<Petition>, sqlx::Error> {
    let sql = format!("{} WHERE order_id = ?", PETITION_COLUMNS);
    sqlx::query_as::<_, Petition>(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await
}
