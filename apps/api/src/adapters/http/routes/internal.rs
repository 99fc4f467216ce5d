//! Invalidation hooks for the billing webhook handler and the admin plan editor.
//!
//! Every route requires the shared `x-internal-token` header.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::require_internal_token},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions/{user_id}/invalidate",
            post(invalidate_subscription),
        )
        .route("/plans/invalidate", post(invalidate_plans))
        .route(
            "/plans/{plan_id}/invalidate-subscriptions",
            post(invalidate_subscriptions_for_plan),
        )
}

async fn invalidate_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_internal_token(&headers, &app_state.config.internal_api_token)?;
    app_state
        .subscription_use_cases
        .invalidate_subscription_cache(user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn invalidate_plans(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    require_internal_token(&headers, &app_state.config.internal_api_token)?;
    app_state.subscription_use_cases.invalidate_plans_cache();
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct InvalidatedResponse {
    invalidated_users: usize,
}

async fn invalidate_subscriptions_for_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_internal_token(&headers, &app_state.config.internal_api_token)?;
    let invalidated_users = app_state
        .subscription_use_cases
        .invalidate_subscriptions_for_plan(plan_id)
        .await?;
    Ok(Json(InvalidatedResponse { invalidated_users }))
}
