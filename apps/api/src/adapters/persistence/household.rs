use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_resolver::HouseholdRepo,
};

#[async_trait]
impl HouseholdRepo for PostgresPersistence {
    async fn get_active_household_id(&self, user_id: Uuid) -> AppResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT household_id FROM user_active_households WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn get_default_household_id(&self, user_id: Uuid) -> AppResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
                SELECT household_id FROM household_members
                WHERE user_id = $1 AND status = 'active' AND is_default
                LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn get_household_owner(&self, household_id: Uuid) -> AppResult<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT created_by FROM households WHERE id = $1",
        )
        .bind(household_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(owner.flatten())
    }

    async fn find_owned_household_ids(&self, owner_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM households WHERE created_by = $1")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
    }

    async fn find_active_household_members(&self, household_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM household_members WHERE household_id = $1 AND status = 'active'",
        )
        .bind(household_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
