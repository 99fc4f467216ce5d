use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan_cache::PlanRepo,
    domain::entities::plan::RawPlan,
};

fn row_to_raw_plan(row: sqlx::postgres::PgRow) -> RawPlan {
    RawPlan {
        id: row.get("id"),
        name: row.get("name"),
        price_monthly: row.get("price_monthly"),
        price_yearly: row.get("price_yearly"),
        // NULL jsonb arrives as Value::Null and normalizes to the default bag
        features: row
            .get::<Option<serde_json::Value>, _>("features")
            .unwrap_or_default(),
        stripe_product_id: row.get("stripe_product_id"),
        stripe_price_id_monthly: row.get("stripe_price_id_monthly"),
        stripe_price_id_yearly: row.get("stripe_price_id_yearly"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, name, price_monthly, price_yearly, features,
    stripe_product_id, stripe_price_id_monthly, stripe_price_id_yearly,
    created_at, updated_at
"#;

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn find_all_plans(&self) -> AppResult<Vec<RawPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM plans ORDER BY price_monthly ASC, name ASC",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_raw_plan).collect())
    }

    async fn find_plan_by_id(&self, id: Uuid) -> AppResult<Option<RawPlan>> {
        let row = sqlx::query(&format!("SELECT {} FROM plans WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_raw_plan))
    }
}
