//! Request identity helpers.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::CookieJar;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

/// The signed-in user, if any. A missing or invalid token yields `None`
/// so reads degrade to the default plan instead of failing.
pub fn current_user_id(jar: &CookieJar, headers: &HeaderMap, app_state: &AppState) -> Option<Uuid> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_owned())
        .or_else(|| bearer_token(headers))?;

    match jwt::user_id_from_token(&token, &app_state.config.jwt_secret) {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            tracing::debug!("Ignoring invalid access token");
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

/// Checks the shared internal token. Both sides are hashed first so the
/// comparison does not depend on where the strings diverge.
pub fn require_internal_token(headers: &HeaderMap, expected: &SecretString) -> AppResult<()> {
    let presented = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Forbidden)?;

    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.expose_secret().as_bytes());
    if presented == expected {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
