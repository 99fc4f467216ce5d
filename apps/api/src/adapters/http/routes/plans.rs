use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_plans))
}

async fn list_plans(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.subscription_use_cases.list_plans().await)
}
