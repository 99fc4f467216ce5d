use async_trait::async_trait;
use ledgerline_types::SubscriptionStatus;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, status_filter},
    app_error::{AppError, AppResult},
    application::use_cases::subscription_resolver::SubscriptionRepo,
    domain::entities::subscription::Subscription,
};

fn row_to_subscription(row: sqlx::postgres::PgRow) -> Subscription {
    let status: String = row.get("status");
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        household_id: row.get("household_id"),
        plan_id: row.get("plan_id"),
        status: SubscriptionStatus::parse_lenient(&status),
        trial_end_date: row.get("trial_end_date"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, household_id, plan_id, status, trial_end_date, created_at
"#;

// Live rows first, then newest. Callers re-rank, this only keeps results stable.
const ORDER_BY: &str = r#"
    ORDER BY CASE WHEN status IN ('active', 'trialing') THEN 0
                  WHEN status IN ('cancelled', 'canceled') THEN 1
                  ELSE 2 END,
             created_at DESC
"#;

impl PostgresPersistence {
    async fn subscriptions_where(
        &self,
        column: &str,
        id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE {} = $1 AND status = ANY($2) {}",
            SELECT_COLS, column, ORDER_BY
        ))
        .bind(id)
        .bind(status_filter(statuses))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_subscription).collect())
    }
}

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn find_subscriptions_by_household(
        &self,
        household_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        self.subscriptions_where("household_id", household_id, statuses)
            .await
    }

    async fn find_subscriptions_by_user(
        &self,
        user_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        self.subscriptions_where("user_id", user_id, statuses).await
    }

    async fn find_subscriptions_by_plan(
        &self,
        plan_id: Uuid,
        statuses: &[SubscriptionStatus],
    ) -> AppResult<Vec<Subscription>> {
        self.subscriptions_where("plan_id", plan_id, statuses).await
    }
}
