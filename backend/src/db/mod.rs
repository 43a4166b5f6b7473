mod petitions;

use sqlx::{MySqlPool, mysql::MySqlPoolOptions};

pub use petitions::{fetch_petition, fetch_petition_by_order_id, insert_petition};

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS petitions (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            author_name VARCHAR(255) NULL,
            user_type VARCHAR(32) NULL,
            crime_types TEXT NULL,
            petition_type VARCHAR(64) NULL,
            content LONGTEXT NOT NULL,
            plan VARCHAR(128) NULL,
            price BIGINT NULL,
            email VARCHAR(255) NULL,
            phone VARCHAR(32) NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
            INDEX idx_petitions_created_at (created_at)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(&pool)
    .await?;

    ensure_column(&pool, "petitions", "order_id", "VARCHAR(64) NULL UNIQUE").await?;

    Ok(pool)
}

async fn ensure_column(
    pool: &MySqlPool,
    table_name: &str,
    column_name: &str,
    column_definition: &str,
) -> Result<(), sqlx::Error> {
    let (existing_count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM information_schema.columns
        WHERE table_schema = DATABASE()
          AND table_name = ?
          AND column_name = ?
        "#,
    )
    .bind(table_name)
    .bind(column_name)
    .fetch_one(pool)
    .await?;

    if existing_count == 0 {
        let alter_sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table_name, column_name, column_definition
        );
        sqlx::query(&alter_sql).execute(pool).await?;
        tracing::info!("Added column {}.{}", table_name, column_name);
    }

    Ok(())
}
