use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerline_types::SubscriptionStatus;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_resolver::UserRepo,
    domain::entities::subscription::DenormalizedSubscription,
};

// Subscription columns on the users row, as stored in the db.
#[derive(sqlx::FromRow, Debug)]
struct UserSubscriptionColumnsDb {
    effective_plan_id: Option<Uuid>,
    effective_subscription_status: Option<String>,
    effective_subscription_id: Option<Uuid>,
    subscription_updated_at: Option<DateTime<Utc>>,
}

impl From<UserSubscriptionColumnsDb> for DenormalizedSubscription {
    fn from(row: UserSubscriptionColumnsDb) -> Self {
        DenormalizedSubscription {
            effective_plan_id: row.effective_plan_id,
            effective_subscription_status: row
                .effective_subscription_status
                .as_deref()
                .map(SubscriptionStatus::parse_lenient),
            effective_subscription_id: row.effective_subscription_id,
            subscription_updated_at: row.subscription_updated_at,
        }
    }
}

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn get_denormalized_subscription(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<DenormalizedSubscription>> {
        let row = sqlx::query_as::<_, UserSubscriptionColumnsDb>(
            r#"
                SELECT effective_plan_id, effective_subscription_status,
                       effective_subscription_id, subscription_updated_at
                FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(DenormalizedSubscription::from))
    }

    async fn request_denormalization_refresh(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("SELECT refresh_user_subscription_cache($1)")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
