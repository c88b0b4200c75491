use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::core::errors::ApiError;
use crate::server::extract::{ApiForm, ApiJson};
use crate::state::AppState;
use crate::users::Role;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.as_str();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password must not be empty".to_string(),
        ));
    }
    if payload.role != Role::User && !state.settings.auth.allow_privileged_self_registration {
        return Err(ApiError::Forbidden(format!(
            "Self-registration as {} is disabled",
            payload.role
        )));
    }

    let hashed = hash_password(&payload.password)?;
    let user = state
        .users
        .create(username, &hashed, payload.role)
        .await
        .map_err(|err| {
            tracing::info!("Registration for {} rejected: {}", username, err);
            ApiError::from(err)
        })?;

    tracing::info!("Registered user {} with role {}", user.username, user.role);
    Ok(Json(json!({
        "message": "User registered successfully",
        "username": user.username
    })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.find_by_username(&form.username).await?;

    let Some(user) = user.filter(|user| verify_password(&form.password, &user.password)) else {
        tracing::warn!("Failed login for {}", form.username);
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let access_token = state.tokens.issue_token(&user.username, user.role)?;
    Ok(Json(json!({
        "access_token": access_token,
        "token_type": "bearer"
    })))
}

pub async fn admin_data(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::Forbidden("Not authorized".to_string()));
    }
    Ok(Json(json!({ "secret_data": "Only admins can see this" })))
}
