use ledgerline_types::SubscriptionStatus;
use sqlx::PgPool;

use crate::app_error::AppError;

pub mod household;
pub mod plan;
pub mod subscription;
pub mod user;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }
}

/// Text values to match a status column against. Rows written with the
/// American spelling `canceled` match `Cancelled`.
pub(crate) fn status_filter(statuses: &[SubscriptionStatus]) -> Vec<String> {
    let mut values: Vec<String> = statuses.iter().map(|s| s.as_ref().to_owned()).collect();
    if statuses.contains(&SubscriptionStatus::Cancelled) {
        values.push("canceled".to_owned());
    }
    values
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::PoolTimedOut => {
                tracing::warn!(error = %err, "Database pool timed out");
                AppError::Timeout("Database pool exhausted".into())
            }
            _ => {
                // Log the actual error for debugging, but don't expose details
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
