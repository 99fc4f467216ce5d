pub mod internal;
pub mod plans;
pub mod subscription;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/subscription", subscription::router())
        .nest("/plans", plans::router())
        .nest("/internal", internal::router())
}
