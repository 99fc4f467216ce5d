use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::CookieJar;
use ledgerline_types::FeatureKey;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, auth::current_user_id},
    app_error::{AppError, AppResult},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_subscription))
        .route("/can-write", get(get_can_write))
        .route("/features/{feature}", get(get_feature))
        .route("/limits/transactions", get(get_transaction_limit))
        .route("/limits/accounts", get(get_account_limit))
}

async fn get_subscription(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user_id = current_user_id(&jar, &headers, &app_state);
    let data = app_state
        .subscription_use_cases
        .get_user_subscription_data(user_id)
        .await;
    Json(data)
}

#[derive(Serialize)]
struct CanWriteResponse {
    allowed: bool,
}

async fn get_can_write(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user_id = current_user_id(&jar, &headers, &app_state);
    let allowed = app_state
        .subscription_use_cases
        .can_user_write(user_id)
        .await;
    Json(CanWriteResponse { allowed })
}

#[derive(Serialize)]
struct FeatureResponse {
    feature: FeatureKey,
    enabled: bool,
}

async fn get_feature(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(feature): Path<String>,
) -> AppResult<impl IntoResponse> {
    let feature = FeatureKey::from_str(&feature)
        .map_err(|_| AppError::InvalidInput(format!("Unknown feature: {feature}")))?;

    let user_id = current_user_id(&jar, &headers, &app_state);
    let enabled = app_state
        .subscription_use_cases
        .check_feature_access(user_id, feature)
        .await;
    Ok(Json(FeatureResponse { feature, enabled }))
}

#[derive(Deserialize)]
struct CurrentCountQuery {
    current: i64,
}

async fn get_transaction_limit(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<CurrentCountQuery>,
) -> AppResult<impl IntoResponse> {
    let current = validate_count(query.current)?;
    let user_id = current_user_id(&jar, &headers, &app_state);
    let check = app_state
        .subscription_use_cases
        .check_transaction_limit(user_id, current)
        .await;
    Ok(Json(check))
}

async fn get_account_limit(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<CurrentCountQuery>,
) -> AppResult<impl IntoResponse> {
    let current = validate_count(query.current)?;
    let user_id = current_user_id(&jar, &headers, &app_state);
    let check = app_state
        .subscription_use_cases
        .check_account_limit(user_id, current)
        .await;
    Ok(Json(check))
}

fn validate_count(current: i64) -> AppResult<i64> {
    if current < 0 {
        return Err(AppError::InvalidInput("current must not be negative".into()));
    }
    Ok(current)
}
